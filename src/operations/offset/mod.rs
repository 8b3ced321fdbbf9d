mod face_offset;

pub use face_offset::{offset_loops, FaceOffset};
