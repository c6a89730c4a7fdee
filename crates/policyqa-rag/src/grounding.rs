use policyqa_core::types::RetrievalResult;

#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Proceed(Vec<RetrievalResult>),
    Refuse,
}

/// Refuses to answer unless the best hit reaches `threshold`.
#[derive(Debug, Clone, Copy)]
pub struct GroundingGate {
    threshold: f32,
}

impl GroundingGate {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// `results` must be ordered best first.
    pub fn gate(&self, results: Vec<RetrievalResult>) -> GateDecision {
        match results.first() {
            Some(top) if top.similarity >= self.threshold => GateDecision::Proceed(results),
            _ => GateDecision::Refuse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use policyqa_core::types::{Chunk, ChunkMetadata};

    fn result(similarity: f32) -> RetrievalResult {
        RetrievalResult {
            chunk: Chunk {
                id: "c1".into(),
                content: "Employees accrue PTO monthly.".into(),
                metadata: ChunkMetadata {
                    source: "pto.md".into(),
                    doc_id: "POL-001".into(),
                    heading: Some("PTO".into()),
                    file_path: "pto.md".into(),
                },
            },
            similarity,
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        let gate = GroundingGate::new(0.3);
        assert!(matches!(gate.gate(vec![result(0.3)]), GateDecision::Proceed(r) if r.len() == 1));
        assert_eq!(gate.gate(vec![result(0.2999)]), GateDecision::Refuse);
    }

    #[test]
    fn empty_results_refuse() {
        assert_eq!(GroundingGate::new(0.3).gate(Vec::new()), GateDecision::Refuse);
    }

    #[test]
    fn nan_similarity_refuses() {
        assert_eq!(GroundingGate::new(0.3).gate(vec![result(f32::NAN)]), GateDecision::Refuse);
    }
}
