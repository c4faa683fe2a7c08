// Record ids are UUIDv7 so they sort by creation time. Listings break
// `created_at` ties on id, which keeps newest-first order stable.

use uuid::Uuid;

/// Generate a new record id (UUIDv7, timestamp-sortable).
pub fn new_id() -> Uuid {
    Uuid::now_v7()
}
