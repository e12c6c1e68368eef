use crate::common::error::AppError;

// ---
// Helpers de tradução de erros do Postgres
// ---

/// Converte violação de chave única em `AppError::Conflict` com uma
/// mensagem de negócio; qualquer outro erro segue como DatabaseError.
pub(crate) fn map_unique_violation(e: sqlx::Error, conflict_message: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::Conflict(conflict_message.to_string());
        }
    }
    e.into()
}

/// `fetch_optional` + id ausente vira `AppError::NotFound`.
pub(crate) fn or_not_found<T>(row: Option<T>, what: &str) -> Result<T, AppError> {
    row.ok_or_else(|| AppError::NotFound(format!("{} não encontrado(a).", what)))
}
