use bullion_core::UserId;

/// Acting user for a request, from the optional `x-user-id` header.
///
/// Authentication is handled upstream; this is only recorded on the rows a
/// request writes (`created_by` / `updated_by`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct ActorContext {
    user_id: Option<UserId>,
}

impl ActorContext {
    pub fn new(user_id: Option<UserId>) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }
}
