// src/services/api_key_service.rs

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::db_utils::or_not_found,
    common::error::AppError,
    common::pagination::{ListParams, Paginated},
    db::tenancy_repo::QuotaCounter,
    db::{ApiKeyRepository, TenantRepository, UserRepository},
    models::api_key::{
        ApiKey, ApiKeyDetail, ApiKeyFilter, ApiKeyStats, ApiKeyType, ApiKeyUsageLog,
        CreateSystemKeyPayload, CreateUserKeyPayload, CreatedApiKey, KeyScope, KeyState,
        RenewApiKeyPayload, RevealHashPayload, RevealedHash, UpdateApiKeyPayload,
    },
    models::auth::User,
    services::auth::AuthService,
};

const KEY_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SECRET_LEN: usize = 40;
const PREFIX_LEN: usize = 8;

/// Gera o segredo aleatório de uma chave nova (sem o prefixo `ck_`).
fn generate_secret() -> String {
    let mut rng = rand::rng();
    (0..SECRET_LEN)
        .map(|_| KEY_ALPHABET[rng.random_range(0..KEY_ALPHABET.len())] as char)
        .collect()
}

/// SHA-256 em hex da chave completa. É o único formato que toca o banco:
/// a autenticação re-hasheia a chave recebida e compara hashes.
fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Um update só troca o tenant da chave quando o payload traz um tenant
/// DIFERENTE do atual; nesse caso o slot de quota muda de dono junto.
fn tenant_rebind(current: Option<Uuid>, requested: Option<Uuid>) -> Option<Uuid> {
    match requested {
        Some(new_tenant) if current != Some(new_tenant) => Some(new_tenant),
        _ => None,
    }
}

/// Renovar só reativa uma chave que estava EXPIRADA; a desativação manual
/// dentro da validade sobrevive à renovação.
fn reactivate_on_renew(key: &ApiKey, now: DateTime<Utc>) -> bool {
    key.state(now) == KeyState::Expired
}

#[derive(Clone)]
pub struct ApiKeyService {
    api_key_repo: ApiKeyRepository,
    tenant_repo: TenantRepository,
    user_repo: UserRepository,
    auth: AuthService,
    pool: PgPool,
}

impl ApiKeyService {
    pub fn new(
        api_key_repo: ApiKeyRepository,
        tenant_repo: TenantRepository,
        user_repo: UserRepository,
        auth: AuthService,
        pool: PgPool,
    ) -> Self {
        Self { api_key_repo, tenant_repo, user_repo, auth, pool }
    }

    /// Chave de sistema: representa o próprio tenant e só autoriza pelos
    /// escopos embutidos. Consome um slot da quota de chaves do tenant.
    pub async fn create_system_key(
        &self,
        payload: &CreateSystemKeyPayload,
    ) -> Result<CreatedApiKey, AppError> {
        or_not_found(self.tenant_repo.find_by_id(payload.tenant).await?, "Tenant")?;

        self.create_key(
            ApiKeyType::System,
            &payload.name,
            payload.application_name.as_deref(),
            Some(payload.tenant),
            None,
            payload.expires_in_days,
            &payload.scopes,
        )
        .await
    }

    /// Chave de usuário: delegada de um usuário, herda as permissões dele
    /// limitadas pelos escopos da chave (a interseção, nunca a união).
    pub async fn create_user_key(
        &self,
        payload: &CreateUserKeyPayload,
    ) -> Result<CreatedApiKey, AppError> {
        or_not_found(self.user_repo.find_by_id(payload.user).await?, "Usuário")?;
        if let Some(tenant_id) = payload.tenant {
            or_not_found(self.tenant_repo.find_by_id(tenant_id).await?, "Tenant")?;
        }

        self.create_key(
            ApiKeyType::User,
            &payload.name,
            None,
            payload.tenant,
            Some(payload.user),
            payload.expires_in_days,
            &payload.scopes,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn create_key(
        &self,
        key_type: ApiKeyType,
        name: &str,
        application_name: Option<&str>,
        tenant_id: Option<Uuid>,
        user_id: Option<Uuid>,
        expires_in_days: Option<i64>,
        scopes: &[KeyScope],
    ) -> Result<CreatedApiKey, AppError> {
        let expires_at = match expires_in_days {
            Some(days) if days <= 0 => {
                return Err(AppError::Validation(
                    "expiresInDays precisa ser positivo.".into(),
                ));
            }
            Some(days) => Some(Utc::now() + Duration::days(days)),
            None => None,
        };

        let secret = generate_secret();
        let plain_key = format!("ck_{}", secret);
        let prefix = format!("ck_{}", &secret[..PREFIX_LEN]);
        let secret_hash = hash_key(&plain_key);

        let mut tx = self.pool.begin().await?;

        // chave vinculada a tenant consome um slot da quota dele
        if let Some(tenant_id) = tenant_id {
            let granted = self
                .tenant_repo
                .try_increment(&mut *tx, tenant_id, QuotaCounter::ApiKeys)
                .await?;
            if !granted {
                return Err(AppError::QuotaExceeded(
                    "A quota de API Keys do tenant foi atingida.".into(),
                ));
            }
        }

        let api_key = self
            .api_key_repo
            .create(
                &mut *tx,
                key_type,
                &prefix,
                &secret_hash,
                name,
                application_name,
                tenant_id,
                user_id,
                expires_at,
            )
            .await?;

        self.api_key_repo.add_scopes(&mut *tx, api_key.id, scopes).await?;

        tx.commit().await?;

        tracing::info!("🔑 API Key {} ({}) criada.", api_key.name, api_key.prefix);

        let scopes = self.api_key_repo.scopes_of(api_key.id).await?;

        // única resposta que carrega o segredo em claro
        Ok(CreatedApiKey {
            api_key: ApiKeyDetail { api_key, scopes },
            key: plain_key,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<ApiKeyDetail, AppError> {
        let api_key = or_not_found(self.api_key_repo.find_by_id(id).await?, "API Key")?;
        let scopes = self.api_key_repo.scopes_of(id).await?;
        Ok(ApiKeyDetail { api_key, scopes })
    }

    pub async fn update(
        &self,
        id: Uuid,
        payload: &UpdateApiKeyPayload,
    ) -> Result<ApiKeyDetail, AppError> {
        let existing = or_not_found(self.api_key_repo.find_by_id(id).await?, "API Key")?;

        // reativar via update passa pela mesma guarda do activate
        if payload.is_active == Some(true) && existing.is_expired(Utc::now()) {
            return Err(AppError::Validation(
                "Uma chave expirada não pode ser ativada; renove a expiração primeiro.".into(),
            ));
        }

        let rebind = tenant_rebind(existing.tenant_id, payload.tenant);
        if let Some(new_tenant) = rebind {
            or_not_found(self.tenant_repo.find_by_id(new_tenant).await?, "Tenant")?;
        }

        let mut tx = self.pool.begin().await?;

        // mudar a chave de tenant move o slot de quota na mesma transação
        if let Some(new_tenant) = rebind {
            let granted = self
                .tenant_repo
                .try_increment(&mut *tx, new_tenant, QuotaCounter::ApiKeys)
                .await?;
            if !granted {
                return Err(AppError::QuotaExceeded(
                    "A quota de API Keys do tenant de destino foi atingida.".into(),
                ));
            }
            if let Some(old_tenant) = existing.tenant_id {
                self.tenant_repo
                    .release(&mut *tx, old_tenant, QuotaCounter::ApiKeys)
                    .await?;
            }
        }

        self.api_key_repo
            .update(
                &mut *tx,
                id,
                payload.name.as_deref(),
                payload.application_name.as_deref(),
                payload.is_active,
                payload.tenant,
            )
            .await?;

        // escopos presentes no payload substituem o conjunto inteiro
        if let Some(scopes) = &payload.scopes {
            self.api_key_repo.clear_scopes(&mut *tx, id).await?;
            self.api_key_repo.add_scopes(&mut *tx, id, scopes).await?;
        }

        tx.commit().await?;

        self.get(id).await
    }

    /// Apaga a chave (escopos e logs caem junto) e devolve o slot de
    /// quota quando havia tenant vinculado.
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let deleted = self.api_key_repo.delete(&mut *tx, id).await?;
        let Some(deleted) = deleted else {
            return Err(AppError::NotFound("API Key não encontrada.".into()));
        };

        if let Some(tenant_id) = deleted.tenant_id {
            self.tenant_repo
                .release(&mut *tx, tenant_id, QuotaCounter::ApiKeys)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// `expired` é terminal: a única saída é o renew explícito.
    pub async fn activate(&self, id: Uuid) -> Result<ApiKey, AppError> {
        let key = or_not_found(self.api_key_repo.find_by_id(id).await?, "API Key")?;

        if key.state(Utc::now()) == KeyState::Expired {
            return Err(AppError::Validation(
                "Uma chave expirada não pode ser ativada; renove a expiração primeiro.".into(),
            ));
        }

        let row = self.api_key_repo.set_active(id, true).await?;
        or_not_found(row, "API Key")
    }

    pub async fn deactivate(&self, id: Uuid) -> Result<ApiKey, AppError> {
        let row = self.api_key_repo.set_active(id, false).await?;
        or_not_found(row, "API Key")
    }

    pub async fn renew(&self, id: Uuid, payload: &RenewApiKeyPayload) -> Result<ApiKey, AppError> {
        if payload.new_expires_at <= Utc::now() {
            return Err(AppError::Validation(
                "A nova expiração precisa estar no futuro.".into(),
            ));
        }

        let key = or_not_found(self.api_key_repo.find_by_id(id).await?, "API Key")?;
        let reactivate = reactivate_on_renew(&key, Utc::now());
        let row = self
            .api_key_repo
            .renew(id, payload.new_expires_at, reactivate)
            .await?;
        or_not_found(row, "API Key")
    }

    /// Devolve o HASH armazenado (nunca o segredo, que é irrecuperável).
    /// Operação sensível: exige a senha do usuário logado de novo.
    pub async fn reveal_hash(
        &self,
        acting_user: &User,
        payload: &RevealHashPayload,
    ) -> Result<RevealedHash, AppError> {
        self.auth
            .verify_password(&payload.password, &acting_user.password_hash)
            .await
            .map_err(|_| {
                AppError::Authentication("Senha incorreta para revelar o hash.".into())
            })?;

        let key = or_not_found(
            self.api_key_repo.find_by_id(payload.api_key_id).await?,
            "API Key",
        )?;

        Ok(RevealedHash {
            id: key.id,
            name: key.name,
            prefix: key.prefix,
            key_hash: key.secret_hash,
        })
    }

    pub async fn list(
        &self,
        filter: &ApiKeyFilter,
        params: &ListParams,
    ) -> Result<Paginated<ApiKey>, AppError> {
        let (rows, total) = self.api_key_repo.list(filter, params).await?;
        Ok(Paginated::new(rows, total, params))
    }

    pub async fn stats(&self, tenant_id: Option<Uuid>) -> Result<ApiKeyStats, AppError> {
        self.api_key_repo.stats(tenant_id).await
    }

    pub async fn usage_logs(
        &self,
        id: Uuid,
        params: &ListParams,
    ) -> Result<Paginated<ApiKeyUsageLog>, AppError> {
        or_not_found(self.api_key_repo.find_by_id(id).await?, "API Key")?;
        let (rows, total) = self.api_key_repo.list_usage_logs(id, params).await?;
        Ok(Paginated::new(rows, total, params))
    }

    /// Autentica uma chave apresentada no header: hasheia, busca pelo
    /// hash e aplica a máquina de estados (só ativa E não expirada vale).
    pub async fn authenticate(
        &self,
        presented_key: &str,
    ) -> Result<(ApiKey, Vec<KeyScope>), AppError> {
        let secret_hash = hash_key(presented_key);

        let key = self
            .api_key_repo
            .find_by_secret_hash(&secret_hash)
            .await?
            .ok_or_else(|| AppError::Authentication("API Key desconhecida.".into()))?;

        if !key.is_usable(Utc::now()) {
            return Err(AppError::Authentication(
                "API Key inativa ou expirada.".into(),
            ));
        }

        self.api_key_repo.touch_last_used(key.id).await?;

        let scopes = self.api_key_repo.scopes_of(key.id).await?;
        Ok((key, scopes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segredo_gerado_usa_o_alfabeto() {
        let secret = generate_secret();
        assert_eq!(secret.len(), SECRET_LEN);
        assert!(secret.bytes().all(|b| KEY_ALPHABET.contains(&b)));
    }

    #[test]
    fn segredos_nao_se_repetem() {
        assert_ne!(generate_secret(), generate_secret());
    }

    #[test]
    fn hash_e_deterministico_e_hex() {
        let h1 = hash_key("ck_abc123");
        let h2 = hash_key("ck_abc123");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert!(h1.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(h1, hash_key("ck_abc124"));
    }

    #[test]
    fn rebind_de_tenant_so_quando_o_destino_muda() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        // payload sem tenant, ou com o mesmo tenant: nenhum slot a mover
        assert_eq!(tenant_rebind(Some(a), None), None);
        assert_eq!(tenant_rebind(Some(a), Some(a)), None);

        // troca de tenant e primeira vinculação movem o slot para o destino
        assert_eq!(tenant_rebind(Some(a), Some(b)), Some(b));
        assert_eq!(tenant_rebind(None, Some(b)), Some(b));
    }

    fn chave(is_active: bool, expires_at: Option<DateTime<Utc>>) -> ApiKey {
        ApiKey {
            id: Uuid::new_v4(),
            key_type: ApiKeyType::User,
            prefix: "ck_teste".into(),
            secret_hash: "abc".into(),
            name: "teste".into(),
            application_name: None,
            tenant_id: None,
            user_id: Some(Uuid::new_v4()),
            is_active,
            expires_at,
            last_used_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn renovacao_so_reativa_chave_expirada() {
        let now = Utc::now();

        // expirada (com qualquer flag) volta ativa
        assert!(reactivate_on_renew(&chave(false, Some(now - Duration::days(1))), now));
        assert!(reactivate_on_renew(&chave(true, Some(now - Duration::days(1))), now));

        // desativada de propósito, ainda na validade: continua desativada
        assert!(!reactivate_on_renew(&chave(false, Some(now + Duration::days(1))), now));
        assert!(!reactivate_on_renew(&chave(false, None), now));
    }
}
