/// Rig slot a bound track writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingSlot {
    Translation(usize), // Maps to pose local translation of the bone
    Rotation(usize),    // Maps to pose local rotation of the bone
    Morph(usize),       // Maps to morph target weight
}

/// Binding relationship: maps track `track_index` of a clip to a resolved slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyBinding {
    pub track_index: usize,
    pub slot: BindingSlot,
}
