// src/services/authz.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::permission_repo::EffectivePermission,
    db::PermissionRepository,
    models::api_key::{ApiKey, ApiKeyType, KeyScope},
    models::auth::User,
};

// ---
// 1. Principal (quem está do outro lado da requisição)
// ---

#[derive(Debug, Clone)]
pub enum Principal {
    // Sessão interativa via JWT
    User(User),

    // Credencial não interativa via X-Api-Key
    ApiKey {
        key: ApiKey,
        scopes: Vec<KeyScope>,
        // preenchido para chaves do tipo `user` (a delegação)
        user: Option<User>,
    },
}

impl Principal {
    /// O usuário "por trás" do principal, quando houver (sessão ou
    /// chave delegada). Chave de sistema não tem usuário.
    pub fn user(&self) -> Option<&User> {
        match self {
            Principal::User(u) => Some(u),
            Principal::ApiKey { user, .. } => user.as_ref(),
        }
    }
}

// ---
// 2. O núcleo puro da avaliação
// ---

/// O conjunto efetivo concede a tripla? Permissão de nível sistema vale
/// em qualquer contexto; permissão de nível tenant só concede dentro do
/// PRÓPRIO tenant dono. Não existe deny explícito: ou alguma permissão
/// concede, ou o resultado é negado.
pub fn permissions_grant(
    perms: &[EffectivePermission],
    tenant_context: Option<Uuid>,
    service: &str,
    resource: &str,
    action: &str,
) -> bool {
    perms.iter().any(|p| {
        let triple_matches =
            p.service == service && p.resource == resource && p.action == action;

        let context_ok = if p.is_tenant_level {
            p.tenant_id.is_some() && p.tenant_id == tenant_context
        } else {
            true
        };

        triple_matches && context_ok
    })
}

/// Os escopos embutidos da chave cobrem a tripla? Escopo é allow-list
/// exata: nenhum curinga, nenhuma hierarquia.
pub fn key_scopes_grant(scopes: &[KeyScope], service: &str, resource: &str, action: &str) -> bool {
    scopes.iter().any(|s| s.matches(service, resource, action))
}

// ---
// 3. O serviço que os middlewares consultam
// ---

#[derive(Clone)]
pub struct AuthzService {
    permission_repo: PermissionRepository,
}

impl AuthzService {
    pub fn new(permission_repo: PermissionRepository) -> Self {
        Self { permission_repo }
    }

    /// Decide se o principal pode executar a tripla no contexto dado.
    ///
    /// - Superusuário: passa direto (bypass de plataforma).
    /// - Usuário comum: a união das permissões dos seus cargos globais +
    ///   cargos do tenant do contexto precisa conceder a tripla.
    /// - Chave de sistema: APENAS os escopos embutidos decidem, e a chave
    ///   nunca age fora do seu próprio tenant.
    /// - Chave de usuário: interseção — os escopos da chave E as
    ///   permissões do usuário delegante precisam conceder. Escopo nunca
    ///   amplia o que o usuário pode.
    pub async fn check(
        &self,
        principal: &Principal,
        tenant_context: Option<Uuid>,
        service: &str,
        resource: &str,
        action: &str,
    ) -> Result<(), AppError> {
        match principal {
            Principal::User(user) => {
                self.check_user(user, tenant_context, service, resource, action)
                    .await
            }

            Principal::ApiKey { key, scopes, user } => {
                // uma chave amarrada a um tenant não age em outro
                if let (Some(own), Some(ctx)) = (key.tenant_id, tenant_context) {
                    if own != ctx {
                        return Err(AppError::Forbidden(
                            "A API Key não pertence ao tenant do contexto.".into(),
                        ));
                    }
                }

                if !key_scopes_grant(scopes, service, resource, action) {
                    return Err(AppError::Forbidden(format!(
                        "A API Key não tem o escopo {}:{}:{}.",
                        service, resource, action
                    )));
                }

                match key.key_type {
                    // escopos bastam: a chave É o tenant
                    ApiKeyType::System => Ok(()),

                    // delegação: o usuário por trás também precisa poder
                    ApiKeyType::User => {
                        let user = user.as_ref().ok_or_else(|| {
                            AppError::Authentication(
                                "A API Key delegada perdeu o usuário dono.".into(),
                            )
                        })?;
                        self.check_user(user, tenant_context, service, resource, action)
                            .await
                    }
                }
            }
        }
    }

    async fn check_user(
        &self,
        user: &User,
        tenant_context: Option<Uuid>,
        service: &str,
        resource: &str,
        action: &str,
    ) -> Result<(), AppError> {
        if !user.is_active {
            return Err(AppError::Forbidden("Usuário desativado.".into()));
        }

        if user.is_superuser {
            return Ok(());
        }

        let perms = self
            .permission_repo
            .effective_for_user(user.id, tenant_context)
            .await?;

        if permissions_grant(&perms, tenant_context, service, resource, action) {
            Ok(())
        } else {
            tracing::debug!(
                user_id = %user.id,
                tenant_context = ?tenant_context,
                "Permissão {}:{}:{} negada.",
                service,
                resource,
                action
            );
            Err(AppError::Forbidden(format!(
                "Permissão {}:{}:{} negada.",
                service, resource, action
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system_perm(service: &str, resource: &str, action: &str) -> EffectivePermission {
        EffectivePermission {
            service: service.into(),
            resource: resource.into(),
            action: action.into(),
            is_tenant_level: false,
            tenant_id: None,
        }
    }

    fn tenant_perm(
        service: &str,
        resource: &str,
        action: &str,
        tenant: Uuid,
    ) -> EffectivePermission {
        EffectivePermission {
            service: service.into(),
            resource: resource.into(),
            action: action.into(),
            is_tenant_level: true,
            tenant_id: Some(tenant),
        }
    }

    #[test]
    fn sem_permissao_nenhuma_nega() {
        assert!(!permissions_grant(&[], None, "tenant_service", "tenant", "read"));
    }

    #[test]
    fn permissao_de_sistema_vale_em_qualquer_contexto() {
        let perms = vec![system_perm("tenant_service", "tenant", "read")];

        assert!(permissions_grant(&perms, None, "tenant_service", "tenant", "read"));
        assert!(permissions_grant(
            &perms,
            Some(Uuid::new_v4()),
            "tenant_service",
            "tenant",
            "read"
        ));
    }

    #[test]
    fn permissao_de_tenant_so_vale_no_proprio_tenant() {
        let tenant_a = Uuid::new_v4();
        let tenant_b = Uuid::new_v4();
        let perms = vec![tenant_perm("billing", "invoice", "read", tenant_a)];

        assert!(permissions_grant(&perms, Some(tenant_a), "billing", "invoice", "read"));
        // no tenant vizinho, nega
        assert!(!permissions_grant(&perms, Some(tenant_b), "billing", "invoice", "read"));
        // sem contexto de tenant, também nega
        assert!(!permissions_grant(&perms, None, "billing", "invoice", "read"));
    }

    #[test]
    fn a_tripla_e_exata_sem_curingas() {
        let perms = vec![system_perm("billing", "invoice", "read")];

        assert!(!permissions_grant(&perms, None, "billing", "invoice", "update"));
        assert!(!permissions_grant(&perms, None, "billing", "payment", "read"));
        assert!(!permissions_grant(&perms, None, "crm", "invoice", "read"));
    }

    #[test]
    fn escopos_da_chave_sao_allow_list_exata() {
        let scopes = vec![
            KeyScope {
                service: "tenant_service".into(),
                resource: "tenant".into(),
                action: "read".into(),
            },
            KeyScope {
                service: "billing".into(),
                resource: "invoice".into(),
                action: "read".into(),
            },
        ];

        assert!(key_scopes_grant(&scopes, "billing", "invoice", "read"));
        assert!(!key_scopes_grant(&scopes, "billing", "invoice", "update"));
        assert!(!key_scopes_grant(&[], "billing", "invoice", "read"));
    }

    #[test]
    fn uniao_de_varios_cargos_concede() {
        let tenant = Uuid::new_v4();
        let perms = vec![
            system_perm("rbac_service", "role", "manage"),
            tenant_perm("billing", "invoice", "read", tenant),
        ];

        assert!(permissions_grant(&perms, Some(tenant), "rbac_service", "role", "manage"));
        assert!(permissions_grant(&perms, Some(tenant), "billing", "invoice", "read"));
    }
}
