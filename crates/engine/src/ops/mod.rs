use std::sync::Arc;

use sea_orm::{ConnectionTrait, DatabaseConnection, prelude::*};

use crate::{Clock, EngineError, Notifier, Recipient, ResultEngine, SystemClock, User, users};

mod aggregates;
mod badges;
mod budgets;
mod eligibility;
mod expenses;

pub use badges::BadgeSweep;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

pub struct Engine {
    database: DatabaseConnection,
    notifier: Notifier,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("database", &self.database)
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Return the [`User`] identified by `user_id`.
    pub async fn user(&self, user_id: &str) -> ResultEngine<User> {
        require_user(&self.database, user_id).await.map(User::from)
    }

    /// Resolve delivery addresses for `user_id`.
    ///
    /// Never fails: a lookup error degrades to a recipient with no address and
    /// the channel decides what to do with it.
    async fn recipient(&self, user_id: &str) -> Recipient {
        match users::Entity::find_by_id(user_id.to_string())
            .one(&self.database)
            .await
        {
            Ok(Some(model)) => Recipient {
                user_id: model.username,
                telegram_id: model.telegram_id,
            },
            Ok(None) => Recipient::new(user_id),
            Err(err) => {
                tracing::warn!(user = user_id, error = %err, "recipient lookup failed");
                Recipient::new(user_id)
            }
        }
    }
}

pub(crate) async fn require_user<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
) -> ResultEngine<users::Model> {
    users::Entity::find_by_id(user_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("user {user_id}")))
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    notifier: Option<Notifier>,
    clock: Option<Arc<dyn Clock>>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Where alerts and badge awards are delivered. Defaults to the log.
    pub fn notifier(mut self, notifier: Notifier) -> EngineBuilder {
        self.notifier = Some(notifier);
        self
    }

    /// Time source. Defaults to [`SystemClock`] in UTC.
    pub fn clock(mut self, clock: impl Clock + 'static) -> EngineBuilder {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            notifier: self.notifier.unwrap_or_default(),
            clock: self
                .clock
                .unwrap_or_else(|| Arc::new(SystemClock::default())),
        })
    }
}
