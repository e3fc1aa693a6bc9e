//! The Kernel: one party's view of the envelope system.
//!
//! The Kernel bundles a party's keys, a predicate registry, and
//! configuration behind the common operations: signing, sealing to other
//! parties, opening what was sealed to us, and threshold backups.

use tracing::{debug, info};

use envelope_kernel_core::{
    DigestProvider, Envelope, EnvelopeFormatter, FormatOptions, PredicateRegistry, SymmetricKey,
};
use envelope_kernel_perms::{reconstruct, RecipientExt, SharingExt};

use crate::error::{KernelError, Result};
use crate::keys::{PrivateKeyBase, PublicKeyBase};

/// Configuration for the Kernel.
#[derive(Debug, Clone, Default)]
pub struct KernelConfig {
    /// Layout used by [`Kernel::format`].
    pub format: FormatOptions,
    /// Note attached to every signature this kernel makes.
    pub signature_note: Option<String>,
}

/// The main Kernel struct.
///
/// Provides a unified API for:
/// - Signing envelopes
/// - Sealing envelopes to recipients and opening them
/// - Verifying senders
/// - Splitting envelopes into SSKR backups and restoring them
#[derive(Debug)]
pub struct Kernel {
    /// The identity keys for this kernel instance.
    keys: PrivateKeyBase,
    /// Predicate names used when formatting.
    registry: PredicateRegistry,
    /// Configuration.
    config: KernelConfig,
}

impl Kernel {
    /// Create a kernel with the well-known predicate names.
    pub fn new(keys: PrivateKeyBase, config: KernelConfig) -> Self {
        Self::with_registry(keys, PredicateRegistry::with_known_predicates(), config)
    }

    pub fn with_registry(
        keys: PrivateKeyBase,
        registry: PredicateRegistry,
        config: KernelConfig,
    ) -> Self {
        Self {
            keys,
            registry,
            config,
        }
    }

    /// Get the kernel's public keys.
    pub fn public_keys(&self) -> PublicKeyBase {
        self.keys.public_keys()
    }

    pub fn registry(&self) -> &PredicateRegistry {
        &self.registry
    }

    /// Mutable access for registering application predicates.
    pub fn registry_mut(&mut self) -> &mut PredicateRegistry {
        &mut self.registry
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Signing
    // ─────────────────────────────────────────────────────────────────────────

    /// Sign the envelope's subject, adding the configured note if any.
    pub fn sign(&self, envelope: &Envelope) -> Envelope {
        envelope.sign_with_note(
            self.keys.signing_keypair(),
            self.config.signature_note.as_deref(),
        )
    }

    /// Check that `sender` signed the envelope's subject.
    pub fn verify_from(&self, envelope: &Envelope, sender: &PublicKeyBase) -> Result<()> {
        envelope.validate_signature(sender.signing())?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sealing
    // ─────────────────────────────────────────────────────────────────────────

    /// Encrypt the subject under a fresh content key and seal that key to
    /// every recipient.
    pub fn seal_to(&self, envelope: &Envelope, recipients: &[PublicKeyBase]) -> Result<Envelope> {
        if recipients.is_empty() {
            return Err(KernelError::NoRecipients);
        }

        let content_key = SymmetricKey::generate();
        let mut sealed = envelope.encrypt(&content_key)?;
        for recipient in recipients {
            sealed = sealed.add_recipient(recipient.agreement(), &content_key)?;
        }

        debug!(
            digest = %envelope.digest(),
            recipients = recipients.len(),
            "sealed envelope"
        );
        Ok(sealed)
    }

    /// Decrypt an envelope sealed to this kernel.
    pub fn open(&self, envelope: &Envelope) -> Result<Envelope> {
        Ok(envelope.decrypt_to_recipient(self.keys.agreement_secret())?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Backup
    // ─────────────────────────────────────────────────────────────────────────

    /// Encrypt under a fresh content key and split the key into SSKR shares.
    ///
    /// `groups` lists `(member_threshold, member_count)`; the result has one
    /// inner vector per group.
    pub fn backup(
        &self,
        envelope: &Envelope,
        group_threshold: usize,
        groups: &[(usize, usize)],
    ) -> Result<Vec<Vec<Envelope>>> {
        let content_key = SymmetricKey::generate();
        let shares = envelope
            .encrypt(&content_key)?
            .split(group_threshold, groups, &content_key)?;

        info!(
            digest = %envelope.digest(),
            group_threshold,
            groups = groups.len(),
            "created share backup"
        );
        Ok(shares)
    }

    /// Recombine envelopes produced by [`Kernel::backup`].
    pub fn restore(&self, shares: &[Envelope]) -> Result<Envelope> {
        Ok(reconstruct(shares)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Diagnostics
    // ─────────────────────────────────────────────────────────────────────────

    /// Render with this kernel's registry and format options.
    pub fn format(&self, envelope: &Envelope) -> String {
        EnvelopeFormatter::new(&self.registry, self.config.format.clone()).format(envelope)
    }
}
