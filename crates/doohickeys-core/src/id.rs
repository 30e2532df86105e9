use slotmap::new_key_type;

new_key_type! {
    /// Identifies a placed part in a contraption.
    pub struct PartId;

    /// Identifies a connection between two adjacent parts.
    pub struct ConnectionId;
}
