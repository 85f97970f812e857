//! The seam to an external proving system.
//!
//! Circuit compilation and the proving keys live outside this crate. A
//! [`ProofBackend`] receives flattened [`CircuitInputs`] and returns an
//! opaque proof plus the public inputs it committed to. [`StorageProver`]
//! refuses to call the backend with a witness the circuit would reject.

use ark_ff::PrimeField;
use thiserror::Error;

use crate::membership::{MembershipOutcome, MembershipVerifier};
use crate::poseidon::FieldHasher;
use crate::utils::errors::StorageProofError;
use crate::witness::{StorageWitness, WitnessIssue};

/// Named input signals, in the order the circuit declares them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CircuitInputs<F> {
    signals: Vec<(&'static str, Vec<F>)>,
}

impl<F> CircuitInputs<F> {
    pub fn push(&mut self, name: &'static str, values: Vec<F>) {
        self.signals.push((name, values));
    }

    pub fn get(&self, name: &str) -> Option<&[F]> {
        self.signals
            .iter()
            .find(|(signal, _)| *signal == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &(&'static str, Vec<F>)> {
        self.signals.iter()
    }

    pub fn total_len(&self) -> usize {
        self.signals.iter().map(|(_, values)| values.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

/// A proof together with the public inputs it was produced against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofArtifacts<P, F> {
    pub proof: P,
    pub public_inputs: Vec<F>,
}

pub trait ProofBackend<F: PrimeField> {
    type Proof;
    type Error: std::error::Error + Send + Sync + 'static;

    fn prove(
        &mut self,
        inputs: &CircuitInputs<F>,
    ) -> Result<ProofArtifacts<Self::Proof, F>, Self::Error>;

    fn verify(&self, proof: &Self::Proof, public_inputs: &[F]) -> Result<bool, Self::Error>;
}

#[derive(Error, Debug)]
pub enum ProveError<E: std::error::Error + 'static> {
    #[error("Malformed witness: {0}")]
    MalformedWitness(String),
    #[error("Opening {position} (leaf {index}) does not match the committed root")]
    MembershipMismatch { position: usize, index: u64 },
    #[error(transparent)]
    Core(#[from] StorageProofError),
    #[error("Proof backend failed: {0}")]
    Backend(#[source] E),
}

pub struct StorageProver<F: PrimeField, H: FieldHasher<F>, B: ProofBackend<F>> {
    verifier: MembershipVerifier<F, H>,
    backend: B,
}

impl<F, H, B> StorageProver<F, H, B>
where
    F: PrimeField,
    H: FieldHasher<F>,
    B: ProofBackend<F>,
{
    pub fn new(verifier: MembershipVerifier<F, H>, backend: B) -> Self {
        Self { verifier, backend }
    }

    #[tracing::instrument(skip_all, name = "StorageProver::prove", fields(openings = witness.len()))]
    pub fn prove(
        &mut self,
        witness: &StorageWitness<F>,
    ) -> Result<ProofArtifacts<B::Proof, F>, ProveError<B::Error>> {
        match witness.check(&self.verifier)? {
            None => {}
            Some(WitnessIssue::Shape(msg)) => return Err(ProveError::MalformedWitness(msg)),
            Some(WitnessIssue::Rejected {
                position,
                index,
                outcome,
            }) => {
                tracing::warn!(position, index, reason = describe(&outcome), "witness rejected");
                return Err(ProveError::MembershipMismatch { position, index });
            }
        }
        self.backend
            .prove(&witness.circuit_inputs())
            .map_err(ProveError::Backend)
    }

    pub fn verify(
        &self,
        artifacts: &ProofArtifacts<B::Proof, F>,
    ) -> Result<bool, ProveError<B::Error>> {
        self.backend
            .verify(&artifacts.proof, &artifacts.public_inputs)
            .map_err(ProveError::Backend)
    }

    pub fn verifier(&self) -> &MembershipVerifier<F, H> {
        &self.verifier
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}

fn describe<F>(outcome: &MembershipOutcome<F>) -> &'static str {
    match outcome {
        MembershipOutcome::Member => "member",
        MembershipOutcome::ChunkHashMismatch { .. } => "chunk hash mismatch",
        MembershipOutcome::RootMismatch { .. } => "root mismatch",
        MembershipOutcome::IndexOutsidePath { .. } => "index outside path",
    }
}
