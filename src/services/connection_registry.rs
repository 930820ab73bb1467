// src/services/connection_registry.rs

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use serde_json::{Value, json};
use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

use crate::models::{
    events::{EVENT_NOTIFICATION, EventEnvelope},
    rbac::Section,
};

/// Lado de envio do canal de uma conexão. O receptor fica com a task que
/// escreve no socket; se ela morrer, o `send` falha.
pub type Outbound = mpsc::Sender<String>;

/// Mensagens que podem ficar na fila de uma conexão. Um cliente que não
/// consome (socket travado) enche a fila e é tratado como conexão quebrada.
pub const OUTBOUND_CAPACITY: usize = 64;

pub fn outbound_channel() -> (Outbound, mpsc::Receiver<String>) {
    mpsc::channel(OUTBOUND_CAPACITY)
}

pub type ConnectionId = u64;

// Seções que recebem o aviso de "usuário conectado"
const PRESENCE_AUDIENCE: [Section; 2] = [Section::Kitchen, Section::Admin];

struct Registration {
    connection_id: ConnectionId,
    section: Section,
    channel: Outbound,
}

/// Diretório das conexões em tempo real, uma por usuário.
///
/// Todas as operações (inserir, remover, iterar para broadcast) passam pelo
/// mesmo `Mutex`, então um broadcast nunca vê o mapa pela metade.
pub struct ConnectionRegistry {
    clients: Mutex<HashMap<Uuid, Registration>>,
    next_id: AtomicU64,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Admite a conexão (a última registrada vence) e avisa cozinha e admin.
    pub async fn register(&self, subject_id: Uuid, section: Section, channel: Outbound) -> ConnectionId {
        let connection_id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let replaced = self
            .clients
            .lock()
            .await
            .insert(subject_id, Registration { connection_id, section, channel })
            .is_some();

        if replaced {
            tracing::info!(%subject_id, %section, "🔁 Conexão substituída (reconexão)");
        } else {
            tracing::info!(%subject_id, %section, "🔌 Conexão registrada");
        }

        self.broadcast(
            &PRESENCE_AUDIENCE,
            EVENT_NOTIFICATION,
            json!(format!("{subject_id} is connected [Admin]")),
        )
        .await;

        connection_id
    }

    /// Remove o usuário. Remover quem não está registrado não é erro.
    pub async fn remove(&self, subject_id: Uuid) -> bool {
        let removed = self.clients.lock().await.remove(&subject_id).is_some();
        if removed {
            tracing::info!(%subject_id, "Conexão removida");
        }
        removed
    }

    /// Caminho de close/erro do socket: só remove se o registro ainda for
    /// desta conexão. Um socket antigo fechando depois de uma reconexão não
    /// derruba o registro novo.
    pub async fn release(&self, subject_id: Uuid, connection_id: ConnectionId) -> bool {
        let mut clients = self.clients.lock().await;
        match clients.get(&subject_id) {
            Some(reg) if reg.connection_id == connection_id => {
                clients.remove(&subject_id);
                tracing::info!(%subject_id, "{} desconectou", subject_id);
                true
            }
            _ => false,
        }
    }

    /// Envia `{type, data}` para todas as conexões das seções alvo.
    ///
    /// Falha de envio em uma conexão (fechada ou com a fila cheia) remove
    /// aquela conexão e não interrompe a entrega para as demais. Retorna
    /// quantas conexões receberam.
    pub async fn broadcast(&self, sections: &[Section], event_type: &str, data: Value) -> usize {
        let envelope = EventEnvelope { event_type: event_type.to_string(), data };
        let message = match serde_json::to_string(&envelope) {
            Ok(m) => m,
            Err(e) => {
                tracing::error!(event_type, error = %e, "Falha ao serializar evento");
                return 0;
            }
        };

        let mut clients = self.clients.lock().await;
        let mut delivered = 0;
        let mut broken: Vec<Uuid> = Vec::new();

        for (subject_id, reg) in clients.iter() {
            if !sections.contains(&reg.section) {
                continue;
            }
            match reg.channel.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::error!(%subject_id, error = %e, "Falha ao enviar para {}", subject_id);
                    broken.push(*subject_id);
                }
            }
        }

        for subject_id in broken {
            clients.remove(&subject_id);
        }

        delivered
    }

    /// Variante crua: envia o payload sem envelope. Falhas só são logadas,
    /// a conexão NÃO é removida.
    pub async fn send_to_sections(&self, sections: &[Section], raw: &str) -> usize {
        let clients = self.clients.lock().await;
        let mut delivered = 0;

        for (subject_id, reg) in clients.iter().filter(|(_, r)| sections.contains(&r.section)) {
            match reg.channel.try_send(raw.to_string()) {
                Ok(()) => delivered += 1,
                Err(e) => tracing::warn!(%subject_id, error = %e, "Envio cru falhou"),
            }
        }

        delivered
    }

    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }

    pub async fn contains(&self, subject_id: Uuid) -> bool {
        self.clients.lock().await.contains_key(&subject_id)
    }

    pub async fn clients_in_section(&self, section: Section) -> Vec<Uuid> {
        self.clients
            .lock()
            .await
            .iter()
            .filter(|(_, r)| r.section == section)
            .map(|(id, _)| *id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::Receiver;

    fn channel() -> (Outbound, Receiver<String>) {
        outbound_channel()
    }

    fn drain(rx: &mut Receiver<String>) -> Vec<EventEnvelope> {
        let mut out = Vec::new();
        while let Ok(raw) = rx.try_recv() {
            out.push(serde_json::from_str(&raw).expect("envelope inválido"));
        }
        out
    }

    #[tokio::test]
    async fn double_close_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let u1 = Uuid::new_v4();
        let (tx, _rx) = channel();

        let conn = registry.register(u1, Section::Kitchen, tx).await;
        assert!(registry.contains(u1).await);

        assert!(registry.release(u1, conn).await);
        assert!(!registry.release(u1, conn).await);
        assert!(!registry.remove(u1).await);
        assert!(!registry.contains(u1).await);
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn broadcast_skips_and_removes_broken_connection() {
        let registry = ConnectionRegistry::new();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let (tx_a, mut rx_a) = channel();
        let (tx_b, rx_b) = channel();
        let (tx_c, mut rx_c) = channel();

        registry.register(a, Section::Kitchen, tx_a).await;
        registry.register(b, Section::Kitchen, tx_b).await;
        registry.register(c, Section::Kitchen, tx_c).await;
        drain(&mut rx_a);
        drain(&mut rx_c);

        // o "socket" de b morreu
        drop(rx_b);

        let delivered = registry.broadcast(&[Section::Kitchen], "order_created", json!({ "id": 1 })).await;

        assert_eq!(delivered, 2);
        for rx in [&mut rx_a, &mut rx_c] {
            let got = drain(rx);
            assert_eq!(got.len(), 1);
            assert_eq!(got[0].event_type, "order_created");
            assert_eq!(got[0].data, json!({ "id": 1 }));
        }
        assert!(!registry.contains(b).await);
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn broadcast_only_reaches_target_sections() {
        let registry = ConnectionRegistry::new();
        let (tx_k, mut rx_k) = channel();
        let (tx_c, mut rx_c) = channel();
        registry.register(Uuid::new_v4(), Section::Kitchen, tx_k).await;
        registry.register(Uuid::new_v4(), Section::Cashier, tx_c).await;
        drain(&mut rx_k);
        drain(&mut rx_c);

        registry.broadcast(&[Section::Cashier], "order_status", json!(null)).await;

        assert!(drain(&mut rx_k).is_empty());
        assert_eq!(drain(&mut rx_c).len(), 1);
    }

    #[tokio::test]
    async fn registration_notifies_kitchen_and_admin_only() {
        let registry = ConnectionRegistry::new();
        let (tx_k, mut rx_k) = channel();
        let (tx_a, mut rx_a) = channel();
        let (tx_m, mut rx_m) = channel();
        registry.register(Uuid::new_v4(), Section::Kitchen, tx_k).await;
        registry.register(Uuid::new_v4(), Section::Admin, tx_a).await;
        registry.register(Uuid::new_v4(), Section::Menu, tx_m).await;
        drain(&mut rx_k);
        drain(&mut rx_a);
        drain(&mut rx_m);

        let cashier = Uuid::new_v4();
        let (tx_c, mut rx_c) = channel();
        registry.register(cashier, Section::Cashier, tx_c).await;

        let expected = json!(format!("{cashier} is connected [Admin]"));
        for rx in [&mut rx_k, &mut rx_a] {
            let got = drain(rx);
            assert_eq!(got.len(), 1);
            assert_eq!(got[0].event_type, EVENT_NOTIFICATION);
            assert_eq!(got[0].data, expected);
        }
        assert!(drain(&mut rx_m).is_empty());
        assert!(drain(&mut rx_c).is_empty());
    }

    #[tokio::test]
    async fn reconnect_replaces_and_stale_close_keeps_new_registration() {
        let registry = ConnectionRegistry::new();
        let u1 = Uuid::new_v4();
        let (old_tx, _old_rx) = channel();
        let (new_tx, mut new_rx) = channel();

        let old = registry.register(u1, Section::Kitchen, old_tx).await;
        let new = registry.register(u1, Section::Admin, new_tx).await;
        assert_ne!(old, new);
        assert_eq!(registry.len().await, 1);
        assert_eq!(registry.clients_in_section(Section::Admin).await, vec![u1]);

        // o socket antigo fecha depois
        assert!(!registry.release(u1, old).await);
        assert!(registry.contains(u1).await);

        drain(&mut new_rx);
        assert_eq!(registry.broadcast(&[Section::Admin], "ping", json!(1)).await, 1);
    }

    #[tokio::test]
    async fn raw_send_failure_does_not_remove() {
        let registry = ConnectionRegistry::new();
        let u1 = Uuid::new_v4();
        let (tx, rx) = channel();
        registry.register(u1, Section::Menu, tx).await;
        drop(rx);

        assert_eq!(registry.send_to_sections(&[Section::Menu], "raw-payload").await, 0);
        assert!(registry.contains(u1).await);
    }

    #[tokio::test]
    async fn raw_send_has_no_envelope() {
        let registry = ConnectionRegistry::new();
        let (tx, mut rx) = channel();
        registry.register(Uuid::new_v4(), Section::Menu, tx).await;

        registry.send_to_sections(&[Section::Menu], "texto cru").await;
        assert_eq!(rx.try_recv().unwrap(), "texto cru");
    }

    #[tokio::test]
    async fn stalled_connection_is_removed_when_queue_fills() {
        let registry = ConnectionRegistry::new();
        let (stalled, healthy) = (Uuid::new_v4(), Uuid::new_v4());
        // ninguém lê desta fila
        let (tx_s, _rx_s) = mpsc::channel(1);
        let (tx_h, mut rx_h) = channel();

        registry.register(stalled, Section::Kitchen, tx_s).await;
        registry.register(healthy, Section::Kitchen, tx_h).await;
        drain(&mut rx_h);

        let mut delivered = Vec::new();
        for i in 0..3 {
            delivered.push(registry.broadcast(&[Section::Kitchen], "order_updated", json!(i)).await);
            drain(&mut rx_h);
        }

        assert_eq!(delivered, vec![1, 1, 1]);
        assert!(!registry.contains(stalled).await);
        assert!(registry.contains(healthy).await);
    }
}
