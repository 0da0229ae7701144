//! User repository.

use super::document::{DeleteMode, Document, DocumentPatch, QueryFilter, RefVisitor};
use super::error::{LookupKey, RepoError, RepoResult};
use super::repository::Repository;
use crate::db::Filter;
use crate::model::user::{NewUser, User, UserFilter, UserPatch};
use crate::model::validation::ValidationError;
use crate::model::{DocumentId, Timestamp};

pub type UserRepository<'s> = Repository<'s, User>;

impl Document for User {
    const COLLECTION: &'static str = "users";
    const DELETE_MODE: DeleteMode = DeleteMode::Soft;

    type Input = NewUser;
    type Patch = UserPatch;
    type Filter = UserFilter;

    fn assemble(id: DocumentId, input: NewUser, now: Timestamp) -> Self {
        Self {
            id,
            name: input.name,
            username: input.username,
            email: input.email,
            email_verified: input.email_verified,
            image: input.image,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        User::validate(self)
    }

    fn visit_refs<V: RefVisitor>(&mut self, _visitor: &mut V) -> RepoResult<()> {
        Ok(())
    }
}

impl DocumentPatch for UserPatch {
    fn validate(&self) -> Result<(), ValidationError> {
        UserPatch::validate(self)
    }

    fn visit_refs<V: RefVisitor>(&mut self, _visitor: &mut V) -> RepoResult<()> {
        Ok(())
    }
}

impl QueryFilter for UserFilter {
    fn to_filter(&self) -> Filter {
        Filter::new()
            .eq_opt("name", self.name.as_deref())
            .eq_opt("email", self.email.as_deref())
            .eq_opt("username", self.username.as_deref())
            .include_deleted(self.include_deleted)
    }
}

impl UserRepository<'_> {
    /// Finds the live account registered under `email`.
    pub fn get_by_email(&self, email: &str) -> RepoResult<User> {
        let filter = UserFilter {
            email: Some(email.to_string()),
            ..UserFilter::default()
        };
        let not_found = || {
            RepoError::not_found(
                User::COLLECTION,
                "get_by_email",
                LookupKey::Filter(filter.to_filter().to_string()),
            )
        };
        match self.query(&filter, 0, 1) {
            Ok(mut page) => page.results.pop().ok_or_else(not_found),
            Err(err) if err.is_not_found() => Err(not_found()),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::UserRepository;
    use crate::db::{open_db_in_memory, DocumentStore};
    use crate::model::user::NewUser;
    use crate::repo::error::ErrorKind;

    #[test]
    fn get_by_email_finds_live_accounts_only() {
        let conn = open_db_in_memory().unwrap();
        let store = DocumentStore::try_new(&conn).unwrap();
        let users = UserRepository::new(store);

        let ada = users.create(NewUser::new("Ada", "ada@example.com")).unwrap();
        assert_eq!(users.get_by_email("ada@example.com").unwrap().id, ada.id);

        users.delete_by_id(ada.id).unwrap();
        let err = users.get_by_email("ada@example.com").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataNotFound);
        assert_eq!(err.operation(), "get_by_email");
    }
}
