/// Reference library identifiers are author-chosen strings (`costume_A`, `r1`).
pub type EntityId = String;
