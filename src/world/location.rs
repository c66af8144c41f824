/// World-space position as carried by the location packets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Facing angle, full circle mapped onto the i16 range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heading(pub i16);

/// Last known player whereabouts, overwritten by every location packet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationSnapshot {
    pub position: Vec3,
    pub heading: Heading,
}

impl LocationSnapshot {
    pub fn new(position: Vec3, heading: Heading) -> Self {
        Self { position, heading }
    }
}
