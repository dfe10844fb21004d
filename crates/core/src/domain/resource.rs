// Bound Resource Model

use super::transaction::ResourceId;

/// A physical resource handle bound to a call stack.
///
/// The rollback-only flag here belongs to the context that opened the
/// physical transaction; participants that joined it set it when they fail.
#[derive(Debug)]
pub struct BoundResource<H> {
    pub(crate) id: ResourceId,
    pub(crate) handle: H,
    pub(crate) rollback_only: bool,
}

impl<H> BoundResource<H> {
    pub(crate) fn new(id: ResourceId, handle: H) -> Self {
        Self {
            id,
            handle,
            rollback_only: false,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn is_rollback_only(&self) -> bool {
        self.rollback_only
    }

    pub(crate) fn mark_rollback_only(&mut self) {
        self.rollback_only = true;
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn handle_mut(&mut self) -> &mut H {
        &mut self.handle
    }

    pub(crate) fn into_handle(self) -> H {
        self.handle
    }
}
