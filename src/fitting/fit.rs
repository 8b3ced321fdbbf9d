use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::error::{FitError, Result};
use crate::geometry::Plane;
use crate::math::polygon_3d::{newell_normal, point_in_polygon_3d};
use crate::math::{Point3, Vector3};
use crate::operations::creation::MakeFace;
use crate::operations::offset::FaceOffset;
use crate::operations::query::{SurfaceGroup, SurfaceGroups};
use crate::operations::transform::TransformFaces;
use crate::topology::{FaceId, TopologyStore, VertexId};

use super::builder::LatticeBuilder;
use super::erode::BorderEroder;
use super::lattice::NodeLattice;
use super::mesh::{restore_placement, GridMesh, MeshEmitter};
use super::normalize::normalize;
use super::FitParams;

/// A closed outline with its holes.
#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    /// Outer loop, counter-clockwise about the group normal.
    pub outer: Vec<Point3>,
    /// Hole loops, clockwise about the group normal.
    pub holes: Vec<Vec<Point3>>,
}

/// Result of fitting one surface group, in world coordinates.
#[derive(Debug, Clone)]
pub struct FittedGrid {
    /// Node positions, raised by the standoff.
    pub nodes: NodeLattice,
    /// Upward-facing unit normal.
    pub normal: Vector3,
    /// Whether the grid follows a curved surface.
    pub curved: bool,
    /// Emitted cells.
    pub mesh: GridMesh,
}

/// Dissolves the edges shared by two or more of `faces` and returns the
/// outlines traced along the remaining boundary edges.
///
/// The faces must be coplanar and share one orientation.
///
/// # Errors
///
/// Returns an error if a face, edge or vertex is missing.
pub fn merge_outlines(store: &TopologyStore, faces: &[FaceId]) -> Result<Vec<Outline>> {
    let Some(&first) = faces.first() else {
        return Ok(Vec::new());
    };
    let plane = store.face(first)?.plane.clone();
    let normal = *plane.plane_normal();
    let members: HashSet<FaceId> = faces.iter().copied().collect();

    let mut boundary: Vec<(VertexId, VertexId)> = Vec::new();
    for &face in faces {
        for lp in store.face(face)?.loops() {
            for i in 0..lp.len() {
                let (a, b) = (lp[i], lp[(i + 1) % lp.len()]);
                let shared = match store.find_edge(a, b) {
                    Some(edge) => {
                        store
                            .edge(edge)?
                            .faces
                            .iter()
                            .filter(|f| members.contains(f))
                            .count()
                            > 1
                    }
                    None => false,
                };
                if !shared {
                    boundary.push((a, b));
                }
            }
        }
    }

    let mut outgoing: HashMap<VertexId, Vec<VertexId>> = HashMap::new();
    for &(a, b) in &boundary {
        outgoing.entry(a).or_default().push(b);
    }
    let mut used: HashSet<(VertexId, VertexId)> = HashSet::new();
    let mut loops = Vec::new();
    for &(start, second) in &boundary {
        if !used.insert((start, second)) {
            continue;
        }
        let mut ids = vec![start];
        let mut current = second;
        let mut closed = true;
        while current != start {
            ids.push(current);
            let next = outgoing.get(&current).and_then(|targets| {
                targets
                    .iter()
                    .copied()
                    .find(|&t| !used.contains(&(current, t)))
            });
            match next {
                Some(next) => {
                    used.insert((current, next));
                    current = next;
                }
                None => {
                    closed = false;
                    break;
                }
            }
        }
        if closed && ids.len() >= 3 {
            loops.push(store.loop_points(&ids)?);
        } else {
            warn!(vertices = ids.len(), "dropping open boundary chain");
        }
    }

    let (outers, holes): (Vec<_>, Vec<_>) = loops
        .into_iter()
        .partition(|lp| newell_normal(lp).dot(&normal) > 0.0);
    let mut outlines: Vec<Outline> = outers
        .into_iter()
        .map(|outer| Outline {
            outer,
            holes: Vec::new(),
        })
        .collect();
    for hole in holes {
        let owner = outlines
            .iter_mut()
            .find(|o| point_in_polygon_3d(&hole[0], &o.outer, &plane));
        match owner {
            Some(outline) => outline.holes.push(hole),
            None => warn!("hole outside every outline; dropped"),
        }
    }
    debug!(faces = faces.len(), outlines = outlines.len(), "merged outlines");
    Ok(outlines)
}

/// Fits one grid to one surface group.
///
/// The group's faces are copied into a scratch store, laid horizontal,
/// sampled, eroded and moved back into place. The source store is only
/// read.
pub struct FitGroup {
    faces: Vec<FaceId>,
    curved: bool,
    params: FitParams,
}

impl FitGroup {
    /// Creates a new `FitGroup` operation.
    #[must_use]
    pub fn new(group: &SurfaceGroup, params: FitParams) -> Self {
        Self {
            faces: group.faces.clone(),
            curved: group.curved,
            params,
        }
    }

    /// Executes the fit. Returns `None` when nothing of a flat group
    /// survives the inset.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid parameters or inconsistent geometry.
    pub fn execute(&self, store: &TopologyStore) -> Result<Option<FittedGrid>> {
        let mut scratch = TopologyStore::new();
        let faces = if self.curved {
            copy_faces(store, &self.faces, &mut scratch)?
        } else {
            inset_outlines(store, &self.faces, self.params.effective_offset(), &mut scratch)?
        };
        if faces.is_empty() {
            warn!(faces = self.faces.len(), "group vanished under the inset; skipped");
            return Ok(None);
        }

        let orientation = normalize(&scratch, &faces)?;
        TransformFaces::new(faces.clone(), orientation.inverse).execute(&mut scratch)?;

        let mut nodes =
            LatticeBuilder::new(faces, self.curved, self.params.density).execute(&scratch)?;
        if let Some(rings) = self.params.erosion {
            BorderEroder::new(rings as usize).execute(&mut nodes);
        }
        let nodes = restore_placement(&nodes, &orientation, self.params.standoff);
        let mesh = MeshEmitter::new(self.curved).execute(&nodes);
        debug!(
            nx = nodes.nx(),
            ny = nodes.ny(),
            cells = mesh.len(),
            curved = self.curved,
            "fitted grid"
        );
        Ok(Some(FittedGrid {
            nodes,
            normal: orientation.normal,
            curved: self.curved,
            mesh,
        }))
    }
}

fn copy_faces(
    store: &TopologyStore,
    faces: &[FaceId],
    scratch: &mut TopologyStore,
) -> Result<Vec<FaceId>> {
    let mut copies = Vec::with_capacity(faces.len());
    for &face in faces {
        let (outer, holes) = store.face_loops(face)?;
        copies.push(MakeFace::new(outer).with_holes(holes).execute(scratch)?);
    }
    Ok(copies)
}

fn inset_outlines(
    store: &TopologyStore,
    faces: &[FaceId],
    offset: f64,
    scratch: &mut TopologyStore,
) -> Result<Vec<FaceId>> {
    let mut copies = Vec::new();
    for outline in merge_outlines(store, faces)? {
        let merged = match MakeFace::new(outline.outer)
            .with_holes(outline.holes)
            .execute(scratch)
        {
            Ok(face) => face,
            Err(err) => {
                warn!(%err, "merged outline is degenerate; dropped");
                continue;
            }
        };
        let inset = FaceOffset::new(merged, -offset).execute(scratch)?;
        scratch.remove_face(merged)?;
        let Some(mut loops) = inset else {
            warn!(offset, "outline collapsed under the inset; dropped");
            continue;
        };
        let outer = loops.remove(0);
        if Plane::from_loop(&outer).is_err() {
            warn!("inset outline is degenerate; dropped");
            continue;
        }
        copies.push(MakeFace::new(outer).with_holes(loops).execute(scratch)?);
    }
    Ok(copies)
}

/// Fits grids to a face selection, one per surface group.
pub struct FitGrids {
    selection: Vec<FaceId>,
    params: FitParams,
}

impl FitGrids {
    /// Creates a new `FitGrids` operation.
    #[must_use]
    pub fn new(selection: Vec<FaceId>, params: FitParams) -> Self {
        Self { selection, params }
    }

    /// Executes the fit. Groups that produce nothing are skipped.
    ///
    /// # Errors
    ///
    /// - [`FitError::NoFaces`] if the selection holds no face of the store
    /// - [`FitError::NothingFitted`] if every group was skipped
    /// - [`FitError::InvalidParameters`] for unusable parameters
    pub fn execute(&self, store: &TopologyStore) -> Result<Vec<(SurfaceGroup, FittedGrid)>> {
        self.params.validate()?;
        let selection: Vec<FaceId> = self
            .selection
            .iter()
            .copied()
            .filter(|&f| store.contains_face(f))
            .collect();
        if selection.is_empty() {
            return Err(FitError::NoFaces.into());
        }

        let groups = SurfaceGroups::new(selection).execute(store)?;
        let mut fitted = Vec::with_capacity(groups.len());
        for group in groups {
            match FitGroup::new(&group, self.params.clone()).execute(store)? {
                Some(grid) => fitted.push((group, grid)),
                None => debug!(faces = group.faces.len(), "group produced no grid"),
            }
        }
        if fitted.is_empty() {
            return Err(FitError::NothingFitted.into());
        }
        info!(grids = fitted.len(), "fitted grids");
        Ok(fitted)
    }
}
