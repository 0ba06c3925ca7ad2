use kernel::interface::clock::{Clock, DependOnClock};
use kernel::interface::database::{DatabaseConnection, DependOnDatabaseConnection};
use kernel::interface::policy::DependOnLendingPolicy;
use kernel::interface::query::{DependOnInventoryQuery, DependOnLoanQuery};
use kernel::interface::update::{DependOnInventoryModifier, DependOnLoanModifier};
use kernel::prelude::entity::LendingPolicy;
use kernel::KernelError;

use crate::clock::SystemClock;
use crate::config::LendingConfig;
use crate::database::{
    InMemoryDatabase, InMemoryInventoryRepository, InMemoryLoanRepository, PostgresDatabase,
    PostgresInventoryRepository, PostgresLoanRepository,
};

/// Owns everything the lending services need. Constructed once by the host
/// and shared by reference; the stores are never looked up globally.
pub struct LendingModule<Db, C = SystemClock> {
    database: Db,
    clock: C,
    policy: LendingPolicy,
}

impl<Db, C> LendingModule<Db, C> {
    pub fn new(database: Db, clock: C, policy: LendingPolicy) -> Self {
        Self {
            database,
            clock,
            policy,
        }
    }

    pub fn database(&self) -> &Db {
        &self.database
    }
}

impl LendingModule<PostgresDatabase> {
    pub async fn postgres(config: &LendingConfig) -> error_stack::Result<Self, KernelError> {
        let database = PostgresDatabase::connect(config).await?;
        Ok(Self::new(database, SystemClock, config.policy().clone()))
    }
}

impl LendingModule<InMemoryDatabase> {
    pub fn in_memory(config: &LendingConfig) -> Self {
        Self::new(
            InMemoryDatabase::from_config(config),
            SystemClock,
            config.policy().clone(),
        )
    }
}

impl<Db, C> DependOnClock for LendingModule<Db, C>
where
    Db: DatabaseConnection,
    C: Clock,
{
    type Clock = C;
    fn clock(&self) -> &Self::Clock {
        &self.clock
    }
}

impl<Db, C> DependOnLendingPolicy for LendingModule<Db, C>
where
    Db: DatabaseConnection,
    C: Clock,
{
    fn lending_policy(&self) -> &LendingPolicy {
        &self.policy
    }
}

macro_rules! wire_stores {
    ($database:ty, $inventory:ident, $loan:ident) => {
        impl<C: Clock> DependOnDatabaseConnection for LendingModule<$database, C> {
            type DatabaseConnection = $database;
            fn database_connection(&self) -> &Self::DatabaseConnection {
                &self.database
            }
        }

        impl<C: Clock> DependOnInventoryQuery for LendingModule<$database, C> {
            type InventoryQuery = $inventory;
            fn inventory_query(&self) -> &Self::InventoryQuery {
                &$inventory
            }
        }

        impl<C: Clock> DependOnInventoryModifier for LendingModule<$database, C> {
            type InventoryModifier = $inventory;
            fn inventory_modifier(&self) -> &Self::InventoryModifier {
                &$inventory
            }
        }

        impl<C: Clock> DependOnLoanQuery for LendingModule<$database, C> {
            type LoanQuery = $loan;
            fn loan_query(&self) -> &Self::LoanQuery {
                &$loan
            }
        }

        impl<C: Clock> DependOnLoanModifier for LendingModule<$database, C> {
            type LoanModifier = $loan;
            fn loan_modifier(&self) -> &Self::LoanModifier {
                &$loan
            }
        }
    };
}

wire_stores!(
    PostgresDatabase,
    PostgresInventoryRepository,
    PostgresLoanRepository
);
wire_stores!(
    InMemoryDatabase,
    InMemoryInventoryRepository,
    InMemoryLoanRepository
);
