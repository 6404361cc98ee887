//! Business logic services

pub mod catalog;
pub mod issuances;
pub mod users;

use crate::{config::LoansConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub users: users::UsersService,
    pub catalog: catalog::CatalogService,
    pub issuances: issuances::IssuancesService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, loans_config: LoansConfig) -> Self {
        Self {
            users: users::UsersService::new(repository.clone()),
            catalog: catalog::CatalogService::new(repository.clone()),
            issuances: issuances::IssuancesService::new(repository.clone(), loans_config),
            repository,
        }
    }
}
