//! Appending a retry chunk after an incorrect assessment answer.

use super::*;

impl Run {
    /// Draws up to one full pool cycle of the failed tier looking for a gated template. When
    /// none carries a gate the last draw is appended as a breather and the question is not
    /// re-queued, keeping gates and questions aligned.
    pub(super) fn extend_after_failure(&mut self, failed: GateId) {
        let question = self.questions.get(failed.index()).cloned();
        let tier = question
            .as_ref()
            .map(resolve_tier)
            .or_else(|| self.world().gate(failed).map(|gate| gate.tier))
            .unwrap_or(Tier::Easy);

        let attempts = self.sequencer.pool_len(tier).max(1);
        let mut chosen = None;
        for attempt in 1..=attempts {
            let template_id = self.sequencer.next_chunk_for_difficulty(tier);
            match self.assembler.template_has_gate(&template_id) {
                Ok(true) => {
                    chosen = Some(template_id);
                    break;
                }
                Ok(false) if attempt == attempts => {
                    info!(template_id = %template_id, %tier, "no gated template; appending breather");
                    chosen = Some(template_id);
                }
                Ok(false) => debug!(template_id = %template_id, "gate-less template skipped"),
                Err(error) => {
                    warn!(%error, template_id = %template_id, "extension template unavailable");
                    break;
                }
            }
        }

        let Some(template_id) = chosen else {
            self.mark_dirty();
            return;
        };

        match self.assembler.append_chunk(&template_id) {
            Ok(chunk) => {
                self.extended_chunk_log.push(template_id.clone());
                if chunk.gate.is_some()
                    && let Some(question) = question
                {
                    debug!(question_id = %question.id, "question re-queued for review");
                    self.questions.push(question);
                }
                info!(
                    template_id = %template_id,
                    gate = ?chunk.gate,
                    log_len = self.extended_chunk_log.len(),
                    "map extended"
                );
            }
            Err(error) => warn!(%error, template_id = %template_id, "extension failed"),
        }
        self.mark_dirty();
    }
}
