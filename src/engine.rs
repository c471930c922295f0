//! Decision pipeline for Skillpath.
//!
//! [`Engine`] is the entry point the game calls after every player action.
//! Per decision it builds the context, classifies the active skills, evaluates
//! each triggered skill, folds the verdicts into the player's state machines,
//! re-checks gates and logs the evaluations to session memory.
//!
//! Nothing here may fail a game turn. [`Engine::on_action`] always returns a
//! report; storage and event-log failures are logged and tracked in
//! [`StorageHealth`], and the whole player record is rewritten on the next
//! mutation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{events_log_path, Config};
use crate::context::{ContextBuilder, DecisionInput, LiveAction};
use crate::core::{
    mode_for, record_evaluation, windowed_accuracy, CoachingMode, ExperienceLevel, GateController,
    PlayerProgress, PlayerSkillState, SkillBackfill, SkillEvaluation, SkillRegistry, SkillState,
    SkillTransition,
};
use crate::error::{FailOpen, Result, SkillpathError};
use crate::events::{EventLogger, ProgressEventType};
use crate::rules::RuleRegistry;
use crate::session::{SessionMemory, SessionSummary};
use crate::storage::ProgressStore;

/// What one decision did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionReport {
    pub player_id: String,
    pub hand_number: u32,
    /// Active skills whose trigger held.
    pub triggered: Vec<String>,
    /// One evaluation per triggered skill.
    pub evaluations: Vec<SkillEvaluation>,
    pub transitions: Vec<SkillTransition>,
    pub unlocked_gates: Vec<u32>,
    pub backfilled: Vec<SkillBackfill>,
    /// Whether every durable write for this decision succeeded.
    pub persisted: bool,
}

/// Running record of durable write failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageHealth {
    pub consecutive_failures: u32,
    pub total_failures: u64,
    pub last_error: Option<String>,
    pub last_failure_at: Option<DateTime<Utc>>,
}

impl StorageHealth {
    pub fn is_healthy(&self) -> bool {
        self.consecutive_failures == 0
    }

    fn record_success(&mut self) {
        if self.consecutive_failures > 0 {
            tracing::info!(
                after_failures = self.consecutive_failures,
                "progress storage recovered"
            );
        }
        self.consecutive_failures = 0;
    }

    fn record_failure(&mut self, err: &SkillpathError) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.total_failures = self.total_failures.saturating_add(1);
        self.last_error = Some(err.to_string());
        self.last_failure_at = Some(Utc::now());
    }
}

/// Per-skill view of a player's progress for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillSummary {
    pub skill_id: String,
    pub name: String,
    pub gate: u32,
    /// Absent for skills of locked gates.
    pub state: Option<SkillState>,
    pub accuracy: f64,
    pub opportunities: u32,
    pub window_len: usize,
    pub mode: CoachingMode,
}

/// A cached player record. `durable` is false when the store could not be
/// read; such records carry in-session progress but are never written back.
#[derive(Clone)]
struct PlayerSlot {
    handle: Arc<Mutex<PlayerProgress>>,
    durable: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The skill-progression engine.
pub struct Engine<S: ProgressStore> {
    store: S,
    registry: Arc<SkillRegistry>,
    rules: RuleRegistry,
    config: Config,
    events: Option<EventLogger>,
    players: Mutex<HashMap<String, PlayerSlot>>,
    sessions: Mutex<HashMap<String, SessionMemory>>,
    health: Mutex<StorageHealth>,
}

impl<S: ProgressStore> std::fmt::Debug for Engine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("rules", &self.rules)
            .field("config", &self.config)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

impl<S: ProgressStore> Engine<S> {
    /// Engine with the built-in rules and no event log.
    pub fn new(store: S, registry: Arc<SkillRegistry>, config: Config) -> Self {
        Self {
            store,
            registry,
            rules: RuleRegistry::builtin(),
            config,
            events: None,
            players: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
            health: Mutex::new(StorageHealth::default()),
        }
    }

    /// Engine wired from configuration: curriculum file, event log.
    pub fn from_config(store: S, config: Config) -> Self {
        let registry = SkillRegistry::load_or_builtin(config.curriculum.path.as_deref());
        let events = if config.events.enabled {
            events_log_path().map(EventLogger::new)
        } else {
            None
        };
        if let Some(logger) = &events {
            tracing::debug!(path = %logger.path().display(), "progress event log enabled");
        }
        let mut engine = Self::new(store, Arc::new(registry), config);
        engine.events = events;
        engine
    }

    pub fn with_rules(mut self, rules: RuleRegistry) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_event_logger(mut self, logger: EventLogger) -> Self {
        self.events = Some(logger);
        self
    }

    pub fn registry(&self) -> &Arc<SkillRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn storage_health(&self) -> StorageHealth {
        lock(&self.health).clone()
    }

    // =========================================================================
    // Decision pipeline
    // =========================================================================

    /// Evaluate one player action and update progress.
    ///
    /// Never fails. A missing session is started on the fly.
    pub fn on_action(
        &self,
        session_id: &str,
        input: &DecisionInput,
        live: &LiveAction,
    ) -> DecisionReport {
        let mut report = DecisionReport {
            player_id: input.player_id.clone(),
            hand_number: input.hand_number,
            persisted: true,
            ..Default::default()
        };

        let ctx = ContextBuilder::build(input, Some(live));
        self.with_session(session_id, &input.player_id, |_| {});
        let slot = self.load_slot(&input.player_id, &mut report);
        let mut progress = lock(&slot.handle);
        if !slot.durable {
            report.persisted = false;
        }

        let candidates: Vec<&str> = self
            .registry
            .skills_in_order()
            .into_iter()
            .filter(|s| progress.is_gate_unlocked(s.gate) && s.applies_in(ctx.phase))
            .map(|s| s.id.as_str())
            .collect();
        report.triggered = self.rules.classify(&ctx, candidates);

        let marginal_credit = self.config.evidence.marginal_credit;

        for skill_id in report.triggered.clone() {
            let evaluation = self.rules.evaluate(&skill_id, live, &ctx);
            report.evaluations.push(evaluation.clone());

            if !evaluation.outcome.is_applicable() {
                continue;
            }
            let definition = match self.registry.require(&skill_id) {
                Ok(definition) => definition,
                Err(e) => {
                    tracing::debug!("triggered skill skipped: {}", e);
                    continue;
                }
            };

            let state = progress
                .skills
                .entry(skill_id.clone())
                .or_insert_with(|| PlayerSkillState::new(&skill_id, SkillState::Introduced));
            let transition =
                record_evaluation(state, &evaluation, &definition.evidence, marginal_credit);
            progress.touch();

            if let Some(transition) = &transition {
                tracing::info!(
                    player_id = %progress.player_id,
                    skill_id = %transition.skill_id,
                    from = %transition.from,
                    to = %transition.to,
                    accuracy = transition.accuracy,
                    "skill transition"
                );
                self.emit(
                    slot.durable,
                    ProgressEventType::skill_transition(&progress.player_id, transition),
                );
            }

            // Every recorded opportunity can satisfy the next gate, not only
            // state changes: a curriculum update may lower a requirement.
            let mut gates = GateController::new(&mut progress, &self.registry);
            if let Some(gate) = gates.check_after_mutation(&skill_id) {
                let backfilled = gates.backfill_missing_skills();
                self.emit(
                    slot.durable,
                    ProgressEventType::gate_unlocked(&progress.player_id, gate),
                );
                for backfill in &backfilled {
                    self.emit(
                        slot.durable,
                        ProgressEventType::skill_backfilled(&progress.player_id, backfill),
                    );
                }
                report.unlocked_gates.push(gate);
                report.backfilled.extend(backfilled);
            }

            if slot.durable && !self.persist(&progress) {
                report.persisted = false;
            }
            report.transitions.extend(transition);

            self.with_session(session_id, &input.player_id, |session| {
                session.record(input.hand_number, evaluation);
            });
        }

        report
    }

    /// Load (or create) a player's record, running first-contact setup and
    /// versioning backfill.
    ///
    /// A transient record is reused while the store stays unreadable. Once a
    /// read succeeds the stored record wins; with nothing stored, the
    /// in-session progress becomes durable.
    fn load_slot(&self, player_id: &str, report: &mut DecisionReport) -> PlayerSlot {
        let mut players = lock(&self.players);
        let transient = match players.get(player_id) {
            Some(slot) if slot.durable => return slot.clone(),
            Some(slot) => Some(slot.clone()),
            None => None,
        };

        let mut promoted = false;
        let (mut progress, durable) = match self.store.get(player_id) {
            Ok(Some(progress)) => {
                if transient.is_some() {
                    tracing::info!(
                        player_id = %player_id,
                        "progress readable again, dropping in-session record"
                    );
                }
                (progress, true)
            }
            Ok(None) => match &transient {
                Some(slot) => {
                    promoted = true;
                    (lock(&slot.handle).clone(), true)
                }
                None => (PlayerProgress::new(player_id), true),
            },
            Err(e) => {
                if let Some(slot) = transient {
                    tracing::debug!(player_id = %player_id, "progress still unreadable: {}", e);
                    return slot;
                }
                tracing::warn!(
                    player_id = %player_id,
                    "could not load progress, continuing in memory: {}",
                    e
                );
                self.track_failure(&e);
                (PlayerProgress::new(player_id), false)
            }
        };

        let mut gates = GateController::new(&mut progress, &self.registry);
        let entry_unlocked = gates.ensure_entry_gate();
        let backfilled = gates.backfill_missing_skills();

        if durable {
            if entry_unlocked {
                self.emit(true, ProgressEventType::gate_unlocked(player_id, 1));
            }
            for backfill in &backfilled {
                self.emit(true, ProgressEventType::skill_backfilled(player_id, backfill));
            }
            if (promoted || entry_unlocked || !backfilled.is_empty()) && !self.persist(&progress)
            {
                report.persisted = false;
            }
        }
        if entry_unlocked {
            report.unlocked_gates.push(1);
        }
        report.backfilled.extend(backfilled);

        let slot = PlayerSlot {
            handle: Arc::new(Mutex::new(progress)),
            durable,
        };
        players.insert(player_id.to_string(), slot.clone());
        slot
    }

    /// Drop a player's cached record once no session needs it. A durable
    /// record is flushed first and stays cached if the flush fails.
    fn release_player(&self, player_id: &str) {
        let mut players = lock(&self.players);
        let Some(slot) = players.get(player_id) else {
            return;
        };
        if slot.durable && !self.persist(&lock(&slot.handle)) {
            tracing::warn!(player_id = %player_id, "keeping unsaved progress cached");
            return;
        }
        players.remove(player_id);
        tracing::debug!(player_id = %player_id, "released player record");
    }

    /// Count a failure against storage health. Other errors are not a
    /// storage concern.
    fn track_failure(&self, error: &SkillpathError) {
        if error.is_storage() {
            lock(&self.health).record_failure(error);
        }
    }

    /// Write the whole record. Returns false (and logs) on failure.
    fn persist(&self, progress: &PlayerProgress) -> bool {
        match self.store.put(progress) {
            Ok(()) => {
                lock(&self.health).record_success();
                true
            }
            Err(e) => {
                tracing::warn!(
                    player_id = %progress.player_id,
                    "failed to persist progress, will retry on next change: {}",
                    e
                );
                self.track_failure(&e);
                false
            }
        }
    }

    fn emit(&self, durable: bool, data: ProgressEventType) {
        if !durable {
            return;
        }
        if let Some(logger) = &self.events {
            logger
                .record(data)
                .fail_open_default("appending progress event");
        }
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Open a game session for a player.
    pub fn start_session(&self, session_id: &str, player_id: &str) -> Result<()> {
        let mut sessions = lock(&self.sessions);
        if sessions.contains_key(session_id) {
            return Err(SkillpathError::invalid_state(format!(
                "session '{}' is already active",
                session_id
            )));
        }
        sessions.insert(
            session_id.to_string(),
            SessionMemory::new(session_id, player_id, self.config.session.cadence()),
        );
        Ok(())
    }

    /// Close a session and return its summary. Its memory is discarded, and
    /// the player's cached record too when this was their last session.
    pub fn end_session(&self, session_id: &str) -> Result<SessionSummary> {
        let (summary, still_playing) = {
            let mut sessions = lock(&self.sessions);
            let session = sessions
                .remove(session_id)
                .ok_or_else(|| SkillpathError::session_not_found(session_id))?;
            let still_playing = sessions.values().any(|s| s.player_id == session.player_id);
            (session.summary(), still_playing)
        };

        if !still_playing {
            self.release_player(&summary.player_id);
        }
        Ok(summary)
    }

    pub fn session_summary(&self, session_id: &str) -> Result<SessionSummary> {
        lock(&self.sessions)
            .get(session_id)
            .map(|s| s.summary())
            .ok_or_else(|| SkillpathError::session_not_found(session_id))
    }

    /// Evaluations for one hand, worst first.
    pub fn hand_review(&self, session_id: &str, hand_number: u32) -> Result<Vec<SkillEvaluation>> {
        lock(&self.sessions)
            .get(session_id)
            .map(|s| s.hand_review(hand_number))
            .ok_or_else(|| SkillpathError::session_not_found(session_id))
    }

    /// Whether coaching for a skill may be shown now. False for unknown sessions.
    pub fn may_surface(&self, session_id: &str, skill_id: &str, hand_number: u32) -> bool {
        lock(&self.sessions)
            .get(session_id)
            .map(|s| s.may_surface(skill_id, hand_number))
            .unwrap_or(false)
    }

    pub fn record_surfaced(&self, session_id: &str, skill_id: &str, hand_number: u32) -> Result<()> {
        let mut sessions = lock(&self.sessions);
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| SkillpathError::session_not_found(session_id))?;
        session.record_surfaced(skill_id, hand_number);
        Ok(())
    }

    fn with_session(&self, session_id: &str, player_id: &str, f: impl FnOnce(&mut SessionMemory)) {
        let mut sessions = lock(&self.sessions);
        let session = sessions.entry(session_id.to_string()).or_insert_with(|| {
            tracing::debug!(session_id = %session_id, "starting session on first decision");
            SessionMemory::new(session_id, player_id, self.config.session.cadence())
        });
        f(session);
    }

    // =========================================================================
    // Read APIs
    // =========================================================================

    /// Current durable progress for a player.
    pub fn player_progress(&self, player_id: &str) -> Result<PlayerProgress> {
        if let Some(slot) = lock(&self.players).get(player_id) {
            return Ok(lock(&slot.handle).clone());
        }

        let mut progress = self
            .store
            .get(player_id)?
            .ok_or_else(|| SkillpathError::player_not_found(player_id))?;
        GateController::new(&mut progress, &self.registry).backfill_missing_skills();
        Ok(progress)
    }

    /// How the prompt layer should coach a skill for a player.
    ///
    /// Players without a record, or without a row for the skill, get `learn`.
    /// A skill id outside the curriculum gets `silent`: there is nothing
    /// correct to teach about it, and saying nothing beats coaching wrongly.
    pub fn coaching_mode(&self, player_id: &str, skill_id: &str) -> CoachingMode {
        if self.registry.skill(skill_id).is_none() {
            tracing::debug!(skill_id = %skill_id, "coaching mode requested for unknown skill");
            return CoachingMode::Silent;
        }

        let progress = match self.player_progress(player_id) {
            Ok(progress) => Some(progress),
            Err(SkillpathError::PlayerNotFound { .. }) => None,
            Err(e) => {
                tracing::warn!(player_id = %player_id, "reading progress for coaching mode: {}", e);
                self.track_failure(&e);
                None
            }
        };

        mode_for(
            progress.as_ref().and_then(|p| p.skill(skill_id)),
            self.config.evidence.marginal_credit,
            self.config.coaching.practicing_split,
        )
    }

    /// Per-skill summaries in curriculum order.
    pub fn skill_summaries(&self, player_id: &str) -> Result<Vec<SkillSummary>> {
        let progress = self.player_progress(player_id)?;
        let credit = self.config.evidence.marginal_credit;
        let split = self.config.coaching.practicing_split;

        Ok(self
            .registry
            .skills_in_order()
            .into_iter()
            .map(|def| {
                let state = progress.skill(&def.id);
                SkillSummary {
                    skill_id: def.id.clone(),
                    name: def.name.clone(),
                    gate: def.gate,
                    state: state.map(|s| s.state),
                    accuracy: state
                        .map(|s| windowed_accuracy(&s.window, credit))
                        .unwrap_or(0.0),
                    opportunities: state.map(|s| s.opportunities).unwrap_or(0),
                    window_len: state.map(|s| s.window.len()).unwrap_or(0),
                    mode: mode_for(state, credit, split),
                }
            })
            .collect())
    }

    // =========================================================================
    // Onboarding
    // =========================================================================

    /// One-time bootstrap from a self-reported experience level.
    ///
    /// Rejected for players that already have a record.
    pub fn onboard(&self, player_id: &str, level: ExperienceLevel) -> Result<Vec<SkillBackfill>> {
        let mut players = lock(&self.players);
        if players.contains_key(player_id) || self.store.exists(player_id)? {
            return Err(SkillpathError::invalid_state(format!(
                "player '{}' already has progress; onboarding runs once",
                player_id
            )));
        }

        let mut progress = PlayerProgress::new(player_id);
        let seeded = GateController::new(&mut progress, &self.registry).onboard(level)?;

        self.store
            .put(&progress)
            .inspect_err(|e| self.track_failure(e))?;
        lock(&self.health).record_success();

        tracing::info!(
            player_id = %player_id,
            level = level.as_str(),
            skills = seeded.len(),
            "player onboarded"
        );
        self.emit(
            true,
            ProgressEventType::onboarded(player_id, level, seeded.len() as u32),
        );
        for gate in progress.gates.iter().filter(|(_, g)| g.unlocked).map(|(n, _)| *n) {
            self.emit(true, ProgressEventType::gate_unlocked(player_id, gate));
        }

        players.insert(
            player_id.to_string(),
            PlayerSlot {
                handle: Arc::new(Mutex::new(progress)),
                durable: true,
            },
        );
        Ok(seeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ActionKind, HandFlags, Phase, RecordedAction};
    use crate::core::skill_ids::*;
    use crate::core::{GateDefinition, Outcome, SkillDefinition};
    use crate::storage::MemoryProgressStore;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    fn engine() -> Engine<Arc<MemoryProgressStore>> {
        Engine::new(
            Arc::new(MemoryProgressStore::new()),
            Arc::new(SkillRegistry::builtin()),
            Config::default(),
        )
    }

    fn trash_preflop(hand_number: u32) -> DecisionInput {
        DecisionInput {
            player_id: "hero".to_string(),
            hand_number,
            phase: Phase::Preflop,
            hand: HandFlags {
                trash: true,
                ..Default::default()
            },
            cost_to_call: 2.0,
            pot_total: 3.0,
            equity: None,
            history: vec![RecordedAction::new("villain", Phase::Preflop, ActionKind::Raise, 2.0)],
        }
    }

    fn premium_preflop(hand_number: u32) -> DecisionInput {
        DecisionInput {
            hand: HandFlags {
                premium: true,
                ..Default::default()
            },
            ..trash_preflop(hand_number)
        }
    }

    fn fold() -> LiveAction {
        LiveAction::new(ActionKind::Fold, 0.0)
    }

    fn raise() -> LiveAction {
        LiveAction::new(ActionKind::Raise, 6.0)
    }

    /// Store whose reads and writes can be switched off.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryProgressStore,
        failing: AtomicBool,
        unreadable: AtomicBool,
    }

    impl ProgressStore for FlakyStore {
        fn get(&self, player_id: &str) -> Result<Option<PlayerProgress>> {
            if self.unreadable.load(Ordering::SeqCst) {
                return Err(SkillpathError::storage(
                    "/flaky",
                    std::io::Error::other("read failed"),
                ));
            }
            self.inner.get(player_id)
        }

        fn put(&self, progress: &PlayerProgress) -> Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(SkillpathError::storage(
                    "/flaky",
                    std::io::Error::other("disk full"),
                ));
            }
            self.inner.put(progress)
        }

        fn list(&self, limit: usize) -> Result<Vec<PlayerProgress>> {
            self.inner.list(limit)
        }

        fn delete(&self, player_id: &str) -> Result<()> {
            self.inner.delete(player_id)
        }
    }

    /// Store that cannot be read.
    struct BrokenStore;

    impl ProgressStore for BrokenStore {
        fn get(&self, _player_id: &str) -> Result<Option<PlayerProgress>> {
            Err(SkillpathError::serde("corrupt record"))
        }

        fn put(&self, _progress: &PlayerProgress) -> Result<()> {
            panic!("unreadable records must never be overwritten");
        }

        fn list(&self, _limit: usize) -> Result<Vec<PlayerProgress>> {
            Ok(Vec::new())
        }

        fn delete(&self, _player_id: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_first_contact_unlocks_gate_one() {
        let engine = engine();
        let report = engine.on_action("s1", &trash_preflop(1), &fold());

        assert_eq!(report.unlocked_gates, vec![1]);
        assert_eq!(report.triggered, vec![FOLD_TRASH_PREFLOP.to_string()]);
        assert_eq!(report.evaluations[0].outcome, Outcome::Correct);
        assert!(report.persisted);

        let stored = engine.store().get("hero").unwrap().unwrap();
        assert!(stored.is_gate_unlocked(1));
        assert_eq!(stored.skill(FOLD_TRASH_PREFLOP).unwrap().opportunities, 1);
        // Gate 1 skills are backfilled on first contact.
        assert!(stored.skill(POT_ODDS_CALL).is_some());
    }

    #[test]
    fn test_locked_gate_skills_are_not_evaluated() {
        let engine = engine();
        let input = DecisionInput {
            player_id: "hero".to_string(),
            hand_number: 1,
            phase: Phase::Turn,
            hand: HandFlags {
                marginal_made: true,
                ..Default::default()
            },
            cost_to_call: 10.0,
            pot_total: 40.0,
            equity: Some(0.3),
            history: vec![
                RecordedAction::new("villain", Phase::Flop, ActionKind::Bet, 5.0),
                RecordedAction::new("villain", Phase::Turn, ActionKind::Bet, 10.0),
            ],
        };

        let report = engine.on_action("s1", &input, &fold());
        assert!(!report.triggered.contains(&FOLD_TO_DOUBLE_BARREL.to_string()));
        assert!(report.triggered.contains(&POT_ODDS_CALL.to_string()));
    }

    #[test]
    fn test_progression_unlocks_next_gate() {
        let engine = engine();
        let mut unlocked = Vec::new();

        // Transitions apply per opportunity from the sixth on: practicing at 6,
        // reliable at 7, automatic at 8.
        for hand in 1..=8 {
            let trash = engine.on_action("s1", &trash_preflop(hand), &fold());
            let premium = engine.on_action("s1", &premium_preflop(hand), &raise());
            unlocked.extend(trash.unlocked_gates);
            unlocked.extend(premium.unlocked_gates);
        }

        assert!(unlocked.contains(&2));
        let progress = engine.player_progress("hero").unwrap();
        assert!(progress.is_gate_unlocked(2));
        assert!(progress.skill(FOLD_TRASH_PREFLOP).unwrap().state.is_graduated());
        // Gate 2 skills were backfilled when it opened.
        assert_eq!(
            progress.skill(VALUE_BET_SIZING).unwrap().state,
            SkillState::Introduced
        );
        // Backfill never touches rows that already exist.
        assert_eq!(
            progress.skill(POT_ODDS_CALL).unwrap().state,
            SkillState::Introduced
        );
    }

    #[test]
    fn test_session_review_worst_first() {
        let engine = engine();
        engine.start_session("s1", "hero").unwrap();

        let input = DecisionInput {
            hand: HandFlags {
                trash: true,
                premium: true,
                ..Default::default()
            },
            ..trash_preflop(3)
        };
        // Calling: trash skill incorrect, premium skill marginal.
        engine.on_action("s1", &input, &LiveAction::new(ActionKind::Call, 2.0));

        let review = engine.hand_review("s1", 3).unwrap();
        let outcomes: Vec<Outcome> = review.iter().map(|e| e.outcome).collect();
        assert_eq!(outcomes, vec![Outcome::Incorrect, Outcome::Marginal]);

        let summary = engine.end_session("s1").unwrap();
        assert_eq!(summary.evaluations, 2);
        assert!(engine.hand_review("s1", 3).is_err());
    }

    #[test]
    fn test_start_session_twice_rejected() {
        let engine = engine();
        engine.start_session("s1", "hero").unwrap();
        assert!(engine.start_session("s1", "hero").is_err());
    }

    #[test]
    fn test_surface_cadence_through_engine() {
        let engine = engine();
        engine.start_session("s1", "hero").unwrap();

        assert!(engine.may_surface("s1", FOLD_TRASH_PREFLOP, 1));
        engine.record_surfaced("s1", FOLD_TRASH_PREFLOP, 1).unwrap();
        assert!(!engine.may_surface("s1", FOLD_TRASH_PREFLOP, 2));
        assert!(!engine.may_surface("missing", FOLD_TRASH_PREFLOP, 2));
        assert!(engine.record_surfaced("missing", FOLD_TRASH_PREFLOP, 2).is_err());
    }

    #[test]
    fn test_coaching_mode() {
        let engine = engine();
        assert_eq!(
            engine.coaching_mode("nobody", FOLD_TRASH_PREFLOP),
            CoachingMode::Learn
        );
        assert_eq!(engine.coaching_mode("nobody", "no_such_skill"), CoachingMode::Silent);

        engine
            .onboard("pro", ExperienceLevel::Advanced)
            .unwrap();
        assert_eq!(
            engine.coaching_mode("pro", FOLD_TRASH_PREFLOP),
            CoachingMode::Compete
        );
    }

    #[test]
    fn test_onboard_once() {
        let engine = engine();
        let seeded = engine.onboard("p", ExperienceLevel::Intermediate).unwrap();
        assert_eq!(seeded.len(), 6);

        let err = engine.onboard("p", ExperienceLevel::Advanced).unwrap_err();
        assert!(matches!(err, SkillpathError::InvalidState { .. }));

        engine.on_action("s1", &trash_preflop(1), &fold());
        let err = engine.onboard("hero", ExperienceLevel::Beginner).unwrap_err();
        assert!(matches!(err, SkillpathError::InvalidState { .. }));
    }

    #[test]
    fn test_storage_failure_is_tracked_and_retried() {
        let store = Arc::new(FlakyStore::default());
        let engine = Engine::new(
            Arc::clone(&store),
            Arc::new(SkillRegistry::builtin()),
            Config::default(),
        );

        engine.on_action("s1", &trash_preflop(1), &fold());
        store.failing.store(true, Ordering::SeqCst);

        let report = engine.on_action("s1", &trash_preflop(2), &fold());
        assert!(!report.persisted);
        assert_eq!(report.evaluations.len(), 1);
        let health = engine.storage_health();
        assert_eq!(health.consecutive_failures, 1);
        assert!(!health.is_healthy());

        store.failing.store(false, Ordering::SeqCst);
        engine.on_action("s1", &trash_preflop(3), &fold());

        assert!(engine.storage_health().is_healthy());
        // The rewrite carries the opportunity that failed to persist.
        let stored = store.get("hero").unwrap().unwrap();
        assert_eq!(stored.skill(FOLD_TRASH_PREFLOP).unwrap().opportunities, 3);
    }

    #[test]
    fn test_unreadable_record_is_never_overwritten() {
        let engine = Engine::new(BrokenStore, Arc::new(SkillRegistry::builtin()), Config::default());
        let report = engine.on_action("s1", &trash_preflop(1), &fold());

        assert!(!report.persisted);
        assert_eq!(report.evaluations.len(), 1);
        assert_eq!(engine.storage_health().total_failures, 1);
    }

    #[test]
    fn test_unreadable_record_progresses_in_memory() {
        let engine = Engine::new(BrokenStore, Arc::new(SkillRegistry::builtin()), Config::default());

        let mut transitions = Vec::new();
        let mut entry_unlocks = 0;
        for hand in 1..=10 {
            let report = engine.on_action("s1", &trash_preflop(hand), &fold());
            assert!(!report.persisted);
            transitions.extend(report.transitions.into_iter().map(|t| t.to));
            entry_unlocks += report.unlocked_gates.iter().filter(|g| **g == 1).count();
        }

        assert_eq!(
            transitions,
            vec![SkillState::Practicing, SkillState::Reliable, SkillState::Automatic]
        );
        assert_eq!(entry_unlocks, 1);
        let progress = engine.player_progress("hero").unwrap();
        assert_eq!(progress.skill(FOLD_TRASH_PREFLOP).unwrap().opportunities, 10);
        // Only the first failed read is counted.
        assert_eq!(engine.storage_health().total_failures, 1);

        // Ending the session drops the transient record without writing it.
        engine.end_session("s1").unwrap();
        assert!(lock(&engine.players).is_empty());
    }

    #[test]
    fn test_in_session_record_saved_once_store_recovers() {
        let store = Arc::new(FlakyStore::default());
        store.unreadable.store(true, Ordering::SeqCst);
        let engine = Engine::new(
            Arc::clone(&store),
            Arc::new(SkillRegistry::builtin()),
            Config::default(),
        );

        engine.on_action("s1", &trash_preflop(1), &fold());
        engine.on_action("s1", &trash_preflop(2), &fold());
        assert!(store.inner.get("hero").unwrap().is_none());

        store.unreadable.store(false, Ordering::SeqCst);
        let report = engine.on_action("s1", &trash_preflop(3), &fold());
        assert!(report.persisted);

        let stored = store.get("hero").unwrap().unwrap();
        assert_eq!(stored.skill(FOLD_TRASH_PREFLOP).unwrap().opportunities, 3);
    }

    #[test]
    fn test_gate_rechecked_without_state_change() {
        let store = Arc::new(MemoryProgressStore::new());
        let mut progress = PlayerProgress::new("hero");
        progress.gates.entry(1).or_default().unlock();
        for (id, state) in [
            (FOLD_TRASH_PREFLOP, SkillState::Automatic),
            (RAISE_PREMIUM_PREFLOP, SkillState::Automatic),
            (POT_ODDS_CALL, SkillState::Introduced),
        ] {
            progress
                .skills
                .insert(id.to_string(), PlayerSkillState::new(id, state));
        }
        store.put(&progress).unwrap();

        let engine = Engine::new(
            Arc::clone(&store),
            Arc::new(SkillRegistry::builtin()),
            Config::default(),
        );
        let report = engine.on_action("s1", &trash_preflop(1), &fold());

        assert!(report.transitions.is_empty());
        assert_eq!(report.unlocked_gates, vec![2]);
        assert!(report
            .backfilled
            .iter()
            .any(|b| b.skill_id == VALUE_BET_SIZING));
        let stored = store.get("hero").unwrap().unwrap();
        assert!(stored.is_gate_unlocked(2));
        assert!(stored.skill(VALUE_BET_SIZING).is_some());
    }

    #[test]
    fn test_end_session_releases_player() {
        let engine = engine();
        engine.on_action("s1", &trash_preflop(1), &fold());
        engine.start_session("s2", "hero").unwrap();

        engine.end_session("s1").unwrap();
        assert!(lock(&engine.players).contains_key("hero"));

        engine.end_session("s2").unwrap();
        assert!(lock(&engine.players).is_empty());
        // Progress comes back from the store.
        let progress = engine.player_progress("hero").unwrap();
        assert_eq!(progress.skill(FOLD_TRASH_PREFLOP).unwrap().opportunities, 1);
    }

    #[test]
    fn test_unsaved_player_stays_cached_after_session() {
        let store = Arc::new(FlakyStore::default());
        let engine = Engine::new(
            Arc::clone(&store),
            Arc::new(SkillRegistry::builtin()),
            Config::default(),
        );

        store.failing.store(true, Ordering::SeqCst);
        engine.on_action("s1", &trash_preflop(1), &fold());
        engine.end_session("s1").unwrap();
        assert!(lock(&engine.players).contains_key("hero"));

        store.failing.store(false, Ordering::SeqCst);
        engine.on_action("s2", &trash_preflop(2), &fold());
        engine.end_session("s2").unwrap();
        assert!(lock(&engine.players).is_empty());
        let stored = store.get("hero").unwrap().unwrap();
        assert_eq!(stored.skill(FOLD_TRASH_PREFLOP).unwrap().opportunities, 2);
    }

    #[test]
    fn test_backfill_on_load_for_new_curriculum_skill() {
        let store = Arc::new(MemoryProgressStore::new());
        let mut progress = PlayerProgress::new("hero");
        progress.gates.entry(1).or_default().unlock();
        progress.skills.insert(
            "a".to_string(),
            PlayerSkillState::new("a", SkillState::Reliable),
        );
        store.put(&progress).unwrap();

        let registry = SkillRegistry::new(
            vec![
                SkillDefinition::new("a", "A", 1),
                SkillDefinition::new("added_later", "Added later", 1),
            ],
            vec![GateDefinition::new(1, "One", &["a", "added_later"], 1)],
        )
        .unwrap();
        let engine = Engine::new(Arc::clone(&store), Arc::new(registry), Config::default())
            .with_rules(RuleRegistry::new());

        let report = engine.on_action("s1", &trash_preflop(1), &fold());
        assert_eq!(report.backfilled.len(), 1);
        assert_eq!(report.backfilled[0].skill_id, "added_later");

        let stored = store.get("hero").unwrap().unwrap();
        assert_eq!(
            stored.skill("added_later").unwrap().state,
            SkillState::Introduced
        );
    }

    #[test]
    fn test_events_are_logged() {
        let dir = TempDir::new().unwrap();
        let logger = EventLogger::new(dir.path().join("events.log"));
        let engine = engine().with_event_logger(logger.clone());

        for hand in 1..=6 {
            engine.on_action("s1", &trash_preflop(hand), &fold());
        }

        let names: Vec<&'static str> = logger
            .read_all()
            .unwrap()
            .iter()
            .map(|e| e.data.event_name())
            .collect();
        assert!(names.contains(&"gate_unlocked"));
        assert!(names.contains(&"skill_backfilled"));
        assert!(names.contains(&"skill_transition"));
    }

    #[test]
    fn test_skill_summaries() {
        let engine = engine();
        engine.on_action("s1", &trash_preflop(1), &fold());

        let summaries = engine.skill_summaries("hero").unwrap();
        assert_eq!(summaries.len(), 8);
        let first = &summaries[0];
        assert_eq!(first.skill_id, FOLD_TRASH_PREFLOP);
        assert_eq!(first.opportunities, 1);
        assert_eq!(first.accuracy, 1.0);
        assert_eq!(first.mode, CoachingMode::Learn);
        assert!(summaries.iter().any(|s| s.gate == 3 && s.state.is_none()));

        assert!(matches!(
            engine.skill_summaries("nobody"),
            Err(SkillpathError::PlayerNotFound { .. })
        ));
    }
}
