//! Scoped cookie session support for [`Site`](super::Site).

use reqwest::blocking::Client;
use std::cell::RefCell;

/// Swaps a session client into the site's transport slot for the lifetime of
/// the guard. Dropping the guard restores whatever was active before, so the
/// site reverts to its previous transport on every exit path, panics included.
pub(crate) struct SessionGuard<'a> {
    slot: &'a RefCell<Option<Client>>,
    previous: Option<Client>,
}

impl<'a> SessionGuard<'a> {
    pub(crate) fn enter(slot: &'a RefCell<Option<Client>>, session: Client) -> Self {
        let previous = slot.replace(Some(session));
        Self { slot, previous }
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.slot.replace(self.previous.take());
    }
}
