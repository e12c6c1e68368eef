use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro, agora com `thiserror` para melhor ergonomia.
// A taxonomia segue as regras de negócio: cada variante vira um
// status HTTP distinto para o console diferenciar "corrija a entrada"
// de "não permitido" e de "limite atingido".
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Entrada malformada ou combinação de flags inconsistente
    #[error("{0}")]
    Validation(String),

    // Violação de chave única: slug, subdomain, code...
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    // Operação bloqueada por regra de negócio (cargo de sistema, membro owner...)
    #[error("{0}")]
    Forbidden(String),

    // Reverificação de senha falhou (reveal do hash da API Key)
    #[error("{0}")]
    Authentication(String),

    // Um teto max_* seria violado
    #[error("{0}")]
    QuotaExceeded(String),

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    // Variante para erros de banco de dados (sqlx)
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    // O "kind" que o front usa para distinguir os erros entre si.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) | AppError::Validation(_) => "validation_error",
            AppError::Conflict(_) => "conflict_error",
            AppError::NotFound(_) => "not_found_error",
            AppError::Forbidden(_) => "forbidden_error",
            AppError::Authentication(_)
            | AppError::InvalidCredentials
            | AppError::InvalidToken => "authentication_error",
            AppError::QuotaExceeded(_) => "quota_exceeded_error",
            _ => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();

        let (status, message) = match self {
            // Retorna todos os detalhes da validação de payload.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors.iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": kind,
                    "message": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::Authentication(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::QuotaExceeded(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "E-mail ou senha inválidos.".to_string())
            }
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Token de autenticação inválido ou ausente.".to_string(),
            ),

            // Todos os outros erros (DatabaseError, InternalServerError) viram 500.
            // O `tracing` loga a mensagem detalhada que `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": kind, "message": message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_distingue_as_categorias() {
        assert_eq!(AppError::Validation("x".into()).kind(), "validation_error");
        assert_eq!(AppError::Conflict("x".into()).kind(), "conflict_error");
        assert_eq!(AppError::NotFound("x".into()).kind(), "not_found_error");
        assert_eq!(AppError::Forbidden("x".into()).kind(), "forbidden_error");
        assert_eq!(AppError::QuotaExceeded("x".into()).kind(), "quota_exceeded_error");
        assert_eq!(AppError::InvalidToken.kind(), "authentication_error");
    }

    #[test]
    fn quota_exceeded_nao_vira_500() {
        let resp = AppError::QuotaExceeded("limite de usuários atingido".into()).into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
