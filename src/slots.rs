/// Every bookable slot, in display order: bank A then bank B, ten positions each.
pub const SLOTS: [&str; 20] = [
    "A1", "A2", "A3", "A4", "A5", "A6", "A7", "A8", "A9", "A10",
    "B1", "B2", "B3", "B4", "B5", "B6", "B7", "B8", "B9", "B10",
];

pub fn is_valid_slot(slot_id: &str) -> bool {
    SLOTS.contains(&slot_id)
}
