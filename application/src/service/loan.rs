use kernel::interface::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use kernel::interface::query::{DependOnLoanQuery, LoanQuery};
use kernel::prelude::entity::UserId;
use kernel::KernelError;

use crate::transfer::{GetLoansByUserDto, LoanDto};

#[async_trait::async_trait]
pub trait GetLoanService:
    'static + Sync + Send + DependOnDatabaseConnection + DependOnLoanQuery
{
    async fn get_loans_by_user(
        &self,
        dto: GetLoansByUserDto,
    ) -> error_stack::Result<Vec<LoanDto>, KernelError> {
        let mut connection = self.database_connection().transact().await?;
        let loans = self
            .loan_query()
            .find_by_user_id(&mut connection, &UserId::new(dto.user_id))
            .await?;
        connection.commit().await?;
        Ok(loans.into_iter().map(LoanDto::from).collect())
    }
}

impl<T> GetLoanService for T where T: DependOnDatabaseConnection + DependOnLoanQuery {}
