use mindshare_core::{auth_service::AuthScoringService, users::storage::UserStorage};

#[derive(Clone)]
pub struct ServerState {
    auth_service: AuthScoringService,
    users: UserStorage,
}

impl From<(AuthScoringService, UserStorage)> for ServerState {
    fn from(states: (AuthScoringService, UserStorage)) -> Self {
        let (auth_service, users) = states;
        Self {
            auth_service,
            users,
        }
    }
}

impl ServerState {
    pub fn auth_service(&self) -> &AuthScoringService {
        &self.auth_service
    }

    pub fn users(&self) -> &UserStorage {
        &self.users
    }

    /// Port part of the bind address, reported by the health endpoint.
    pub fn port(&self) -> Option<u16> {
        self.auth_service
            .config()
            .server_domain
            .rsplit(':')
            .next()
            .and_then(|port| port.parse().ok())
    }
}
