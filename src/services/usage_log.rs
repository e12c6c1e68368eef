// src/services/usage_log.rs

use tokio::sync::mpsc;

use crate::{db::ApiKeyRepository, models::api_key::UsageEntry};

// O caminho da requisição nunca espera o INSERT do log de uso: ele só
// enfileira e segue. Uma task de fundo drena o canal e grava.
const CHANNEL_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct UsageLogWriter {
    tx: mpsc::Sender<UsageEntry>,
}

impl UsageLogWriter {
    /// Cria o gravador e dispara a task que consome o canal.
    pub fn spawn(api_key_repo: ApiKeyRepository) -> Self {
        let (tx, mut rx) = mpsc::channel::<UsageEntry>(CHANNEL_CAPACITY);

        tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                if let Err(e) = api_key_repo.insert_usage_log(&entry).await {
                    tracing::error!("Falha ao gravar log de uso de API Key: {}", e);
                }
            }
        });

        Self { tx }
    }

    /// Melhor perder um log do que travar a requisição: canal cheio
    /// derruba a entrada com um aviso.
    pub fn record(&self, entry: UsageEntry) {
        if let Err(e) = self.tx.try_send(entry) {
            tracing::warn!("Canal de logs de uso cheio, entrada descartada: {}", e);
        }
    }
}
