//! Operator-facing notifications.

use std::fmt;

use crate::error::{Severity, StoreError, TxError};
use crate::settings::Language;
use crate::sync::ItemState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    pub fn transaction_success(lang: Language) -> Self {
        Self::new(Severity::Success, pick(lang, "Transacción exitosa!", "Transaction successful!"))
    }

    pub fn connected(lang: Language, account: &str) -> Self {
        let msg = match lang {
            Language::Es => format!("Conectado con {}", account),
            Language::En => format!("Connected as {}", account),
        };
        Self::new(Severity::Success, msg)
    }

    pub fn from_tx_error(err: &TxError, lang: Language) -> Self {
        let message = match err {
            TxError::WalletUnavailable => {
                pick(lang, "MetaMask no está instalado", "MetaMask is not installed").to_string()
            }
            TxError::UserRejected => pick(
                lang,
                "Solicitud rechazada por el usuario.",
                "Request rejected by the user.",
            )
            .to_string(),
            TxError::AlreadyPending => pick(
                lang,
                "MetaMask ya está esperando una solicitud. Revisa la extensión.",
                "MetaMask is already waiting for a request. Check the extension.",
            )
            .to_string(),
            TxError::EmptyRecipient => pick(
                lang,
                "Por favor ingresa la dirección del contrato.",
                "Please enter the contract address.",
            )
            .to_string(),
            TxError::ZeroAmount => pick(
                lang,
                "El monto debe ser mayor que cero.",
                "The amount must be greater than zero.",
            )
            .to_string(),
            TxError::InvalidAmount(a) => match lang {
                Language::Es => format!("Monto inválido: {}", a),
                Language::En => format!("Invalid amount: {}", a),
            },
            TxError::UnknownProduct(p) => match lang {
                Language::Es => format!("Producto desconocido: {}", p),
                Language::En => format!("Unknown product: {}", p),
            },
            TxError::NotReady(_) => pick(
                lang,
                "Completa el paso actual primero.",
                "Complete the current step first.",
            )
            .to_string(),
            TxError::Submission(_) => pick(
                lang,
                "Error al realizar la transacción.",
                "Error performing the transaction.",
            )
            .to_string(),
        };
        Self::new(err.severity(), message)
    }

    /// Snapshot write failed; the in-memory state is still valid.
    pub fn persistence_warning(err: &StoreError, lang: Language) -> Self {
        let msg = match lang {
            Language::Es => format!("No se pudo guardar el historial: {}", err),
            Language::En => format!("Could not save history: {}", err),
        };
        Self::new(Severity::Warning, msg)
    }

    pub fn nothing_pending(lang: Language) -> Self {
        Self::new(
            Severity::Info,
            pick(
                lang,
                "No hay transacciones en la ventana de emergencia.",
                "There are no transactions in the emergency window.",
            ),
        )
    }

    pub fn no_transactions(lang: Language) -> Self {
        Self::new(
            Severity::Info,
            pick(lang, "No hay transacciones para mostrar.", "No transactions to display."),
        )
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Status line for one sync item.
pub fn item_status(state: ItemState, lang: Language) -> &'static str {
    match state {
        ItemState::Pending => pick(lang, "Sincronización pendiente...", "Synchronization pending..."),
        ItemState::Syncing => pick(lang, "Sincronizando...", "Synchronizing..."),
        ItemState::Synchronized => pick(lang, "Sincronizado Correctamente!", "Synchronized Successfully!"),
    }
}

fn pick(lang: Language, es: &'static str, en: &'static str) -> &'static str {
    match lang {
        Language::Es => es,
        Language::En => en,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tx_error_has_a_distinct_message() {
        let errors = [
            TxError::WalletUnavailable,
            TxError::UserRejected,
            TxError::AlreadyPending,
            TxError::EmptyRecipient,
            TxError::ZeroAmount,
            TxError::Submission("boom".into()),
        ];

        for lang in [Language::Es, Language::En] {
            let mut seen: Vec<String> = errors
                .iter()
                .map(|e| Notice::from_tx_error(e, lang).message)
                .collect();
            seen.sort();
            seen.dedup();
            assert_eq!(seen.len(), errors.len());
        }
    }

    #[test]
    fn already_pending_is_info() {
        let n = Notice::from_tx_error(&TxError::AlreadyPending, Language::En);
        assert_eq!(n.severity, Severity::Info);
    }

    #[test]
    fn status_lines_follow_language() {
        assert_eq!(item_status(ItemState::Syncing, Language::Es), "Sincronizando...");
        assert_eq!(item_status(ItemState::Synchronized, Language::En), "Synchronized Successfully!");
    }
}
