use devicehub_common::Session;

use super::Lifecycle;

/// Sign-in state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthSlice {
    pub loading: bool,
    pub error: Option<String>,
    pub session: Option<Session>,
}

impl AuthSlice {
    pub(super) fn apply(&mut self, phase: Lifecycle<Session>) {
        match phase {
            Lifecycle::Pending => {
                self.loading = true;
                self.error = None;
            }
            Lifecycle::Fulfilled(session) => {
                self.loading = false;
                self.session = Some(session);
            }
            Lifecycle::Rejected(error) => {
                self.loading = false;
                self.error = Some(error);
            }
        }
    }

    pub(super) fn clear_status(&mut self) {
        self.loading = false;
        self.error = None;
    }

    /// Id of the signed-in user, when it is a usable one.
    #[must_use]
    pub fn user_id(&self) -> Option<i64> {
        self.session
            .as_ref()
            .map(|session| session.user.id)
            .filter(|&id| id > 0)
    }
}
