//! GenerationOrchestrator: per-role generation tasks over the shared ContentPool.
//!
//! Roles are independent: any number of roles may generate at once. Within a role:
//! - a second generate/regenerate while one is in flight is rejected;
//! - a whole-role replace and a single-item correction never interleave, because every
//!   pool write takes the role's write lock and a correction commit is refused once the
//!   role's epoch moved;
//! - collaborator failures are reported as `Failed(reason)` and never retried here.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::collaborator::{
    ContentGenerator, CorrectionRequest, GeneratedQuestion, GenerationError, JobContext,
    RoleGenerationRequest,
};
use crate::generation::difficulty::DifficultyProfile;
use crate::models::QuestionItem;
use crate::pool::ContentPool;
use crate::quota::RoleQuota;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationState {
    NotStarted,
    Generating,
    Ready,
    Failed { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    /// First generation of a role. Refused once the role is `Ready`.
    Initial,
    /// Confirmed regeneration replacing existing content.
    Regenerate,
}

/// Outcome of dispatching one role in a contract-wide fan-out.
#[derive(Debug, Clone, Serialize)]
pub struct RoleDispatch {
    pub role_id: Uuid,
    pub accepted: bool,
    pub state: GenerationState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<String>,
}

pub struct GenerationOrchestrator {
    generator: Arc<dyn ContentGenerator>,
    pool: ContentPool,
    states: Mutex<HashMap<Uuid, GenerationState>>,
    timeout: Duration,
}

impl GenerationOrchestrator {
    pub fn new(generator: Arc<dyn ContentGenerator>, pool: ContentPool, timeout: Duration) -> Self {
        Self {
            generator,
            pool,
            states: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    pub fn pool(&self) -> &ContentPool {
        &self.pool
    }

    pub async fn state(&self, role_id: Uuid) -> GenerationState {
        self.states
            .lock()
            .await
            .get(&role_id)
            .cloned()
            .unwrap_or(GenerationState::NotStarted)
    }

    async fn set_state(&self, role_id: Uuid, state: GenerationState) {
        self.states.lock().await.insert(role_id, state);
    }

    /// Claims the role for generation: the only `* -> Generating` transition.
    async fn claim(&self, quota: &RoleQuota, mode: GenerationMode) -> Result<(), AppError> {
        let role_id = quota.role_id;
        if quota.total_questions() == 0 {
            return Err(AppError::Validation(format!(
                "Role {role_id} has an empty quota; nothing to generate"
            )));
        }

        let mut states = self.states.lock().await;
        match states.get(&role_id) {
            Some(GenerationState::Generating) => {
                return Err(AppError::ConcurrentGenerationRejected { role_id });
            }
            Some(GenerationState::Ready) if mode == GenerationMode::Initial => {
                return Err(AppError::Validation(format!(
                    "Role {role_id} already has generated questions; use regenerate"
                )));
            }
            _ => {}
        }
        states.insert(role_id, GenerationState::Generating);
        info!("Generation started for role {role_id} ({mode:?})");
        Ok(())
    }

    /// Runs the collaborator for a claimed role and records the terminal state.
    async fn run(&self, request: RoleGenerationRequest) -> GenerationState {
        let role_id = request.quota.role_id;

        let outcome = match tokio::time::timeout(self.timeout, self.generator.generate_role(&request)).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(self.timeout.as_secs())),
        }
        .and_then(|output| build_items(&request, output));

        let state = match outcome {
            Ok(items) => {
                self.pool.replace_role(role_id, items).await;
                info!("Generation finished for role {role_id}");
                GenerationState::Ready
            }
            Err(e) => {
                warn!("Generation failed for role {role_id}: {e}");
                GenerationState::Failed {
                    reason: e.to_string(),
                }
            }
        };

        self.set_state(role_id, state.clone()).await;
        state
    }

    /// Generates a role and waits for the terminal state.
    pub async fn generate_for_role(
        &self,
        request: RoleGenerationRequest,
        mode: GenerationMode,
    ) -> Result<GenerationState, AppError> {
        self.claim(&request.quota, mode).await?;
        Ok(self.run(request).await)
    }

    /// Confirmed regeneration. Same as generation apart from accepting a `Ready` role.
    pub async fn regenerate_for_role(
        &self,
        request: RoleGenerationRequest,
    ) -> Result<GenerationState, AppError> {
        self.generate_for_role(request, GenerationMode::Regenerate).await
    }

    /// Claims the role synchronously, then generates in a background task.
    ///
    /// The generation runs in its own task, watched by the returned one: if it panics or is
    /// cancelled the role is marked `Failed` instead of staying `Generating`.
    pub async fn spawn_generation(
        self: &Arc<Self>,
        request: RoleGenerationRequest,
        mode: GenerationMode,
    ) -> Result<JoinHandle<GenerationState>, AppError> {
        let role_id = request.quota.role_id;
        self.claim(&request.quota, mode).await?;

        let worker = {
            let this = Arc::clone(self);
            tokio::spawn(async move { this.run(request).await })
        };
        let this = Arc::clone(self);
        Ok(tokio::spawn(async move {
            match worker.await {
                Ok(state) => state,
                Err(e) => {
                    error!("Generation task for role {role_id} aborted: {e}");
                    let state = GenerationState::Failed {
                        reason: format!("generation task aborted: {e}"),
                    };
                    this.set_state(role_id, state.clone()).await;
                    state
                }
            }
        }))
    }

    /// Contract-wide fan-out: one background task per accepted role.
    pub async fn spawn_for_roles(
        self: &Arc<Self>,
        requests: Vec<RoleGenerationRequest>,
        mode: GenerationMode,
    ) -> Vec<RoleDispatch> {
        let mut dispatches = Vec::with_capacity(requests.len());
        for request in requests {
            let role_id = request.quota.role_id;
            match self.spawn_generation(request, mode).await {
                Ok(_) => dispatches.push(RoleDispatch {
                    role_id,
                    accepted: true,
                    state: GenerationState::Generating,
                    rejection: None,
                }),
                Err(e) => dispatches.push(RoleDispatch {
                    role_id,
                    accepted: false,
                    state: self.state(role_id).await,
                    rejection: Some(e.to_string()),
                }),
            }
        }
        dispatches
    }

    /// Rewrites one item. Every other item of every role stays untouched.
    pub async fn correct_single_item(
        &self,
        role_id: Uuid,
        type_code: &str,
        ordinal: u32,
        instruction: &str,
        context: JobContext,
    ) -> Result<QuestionItem, AppError> {
        if instruction.trim().is_empty() {
            return Err(AppError::Validation(
                "instruction cannot be empty".to_string(),
            ));
        }
        if self.state(role_id).await == GenerationState::Generating {
            return Err(AppError::Conflict(format!(
                "Role {role_id} is being regenerated; retry the correction once it finishes"
            )));
        }

        let (item, epoch) = self.pool.begin_correction(role_id, type_code, ordinal).await?;
        let request = CorrectionRequest {
            item: item.clone(),
            instruction: instruction.to_string(),
            context,
        };

        let outcome = match tokio::time::timeout(self.timeout, self.generator.correct_item(&request)).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(self.timeout.as_secs())),
        };

        match outcome {
            Ok(corrected) => {
                let replacement = QuestionItem {
                    question: corrected.question,
                    expected_answer: corrected.expected_answer,
                    correcting: false,
                    ..item
                };
                let committed = self.pool.commit_correction(role_id, epoch, replacement).await?;
                info!("Corrected {type_code} #{ordinal} of role {role_id}");
                Ok(committed)
            }
            Err(e) => {
                self.pool
                    .abort_correction(role_id, epoch, type_code, ordinal)
                    .await;
                warn!("Correction of {type_code} #{ordinal} for role {role_id} failed: {e}");
                Err(AppError::GenerationFailure(e.to_string()))
            }
        }
    }

    /// Content of a `Ready` role whose pool still matches `quota` type by type.
    ///
    /// Anything else is `IncompleteContent`: a role generated under an older quota must be
    /// regenerated before it can be assembled.
    pub async fn ready_content(&self, quota: &RoleQuota) -> Result<Vec<QuestionItem>, AppError> {
        let role_id = quota.role_id;
        let state = self.state(role_id).await;
        if state != GenerationState::Ready {
            return Err(AppError::IncompleteContent(format!(
                "Role {role_id} is not ready (state: {state:?})"
            )));
        }
        let items = self.pool.get(role_id).await.ok_or_else(|| {
            AppError::IncompleteContent(format!("No generated content for role {role_id}"))
        })?;

        for type_quota in &quota.types {
            let held = items
                .iter()
                .filter(|i| i.type_code == type_quota.type_code)
                .count();
            if held != type_quota.question_count as usize {
                return Err(AppError::IncompleteContent(format!(
                    "Role {role_id} holds {held} {} items but its quota is now {}; regenerate the role",
                    type_quota.type_code, type_quota.question_count
                )));
            }
        }
        if items.len() != quota.total_questions() as usize {
            return Err(AppError::IncompleteContent(format!(
                "Role {role_id} holds questions of types outside its current quota; regenerate the role"
            )));
        }
        Ok(items)
    }
}

/// Turns collaborator output into pool items, enforcing the quota exactly.
fn build_items(
    request: &RoleGenerationRequest,
    mut output: std::collections::BTreeMap<String, Vec<GeneratedQuestion>>,
) -> Result<Vec<QuestionItem>, GenerationError> {
    let role_id = request.quota.role_id;
    let default_difficulty = DifficultyProfile::for_tier(request.context.salary_tier).label;
    let mut items = Vec::with_capacity(request.quota.total_questions() as usize);

    for type_quota in &request.quota.types {
        let questions = output.remove(&type_quota.type_code).unwrap_or_default();
        if questions.is_empty() && type_quota.question_count > 0 {
            return Err(GenerationError::Empty(type_quota.type_code.clone()));
        }
        if questions.len() != type_quota.question_count as usize {
            return Err(GenerationError::CountMismatch {
                type_code: type_quota.type_code.clone(),
                expected: type_quota.question_count,
                actual: questions.len() as u32,
            });
        }

        for (ordinal, q) in questions.into_iter().enumerate() {
            if q.question.trim().is_empty() {
                return Err(GenerationError::Malformed(format!(
                    "{} #{ordinal} has no question text",
                    type_quota.type_code
                )));
            }
            items.push(QuestionItem {
                role_id,
                type_code: type_quota.type_code.clone(),
                ordinal: ordinal as u32,
                question: q.question,
                expected_answer: q.expected_answer,
                difficulty: q
                    .difficulty
                    .filter(|d| !d.trim().is_empty())
                    .unwrap_or_else(|| default_difficulty.to_string()),
                correcting: false,
            });
        }
    }

    if !output.is_empty() {
        warn!(
            "Ignoring unrequested question types for role {role_id}: {:?}",
            output.keys().collect::<Vec<_>>()
        );
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::{Notify, Semaphore};

    use super::*;
    use crate::generation::collaborator::CorrectedItem;
    use crate::models::{RoleDescriptor, SalaryTier};
    use crate::quota::{resolve, GlobalPolicy};

    /// Deterministic stand-in for the generation backend.
    #[derive(Default)]
    struct ScriptedGenerator {
        rounds: AtomicUsize,
        fail_generation: std::sync::Mutex<Option<GenerationError>>,
        fail_correction: std::sync::Mutex<Option<GenerationError>>,
        short_type: std::sync::Mutex<Option<String>>,
        generation_gate: Option<Arc<Semaphore>>,
        correction_gate: Option<Arc<Notify>>,
        correction_entered: Arc<Notify>,
        stall: Option<Duration>,
        panic_on_generate: bool,
    }

    #[async_trait]
    impl ContentGenerator for ScriptedGenerator {
        async fn generate_role(
            &self,
            request: &RoleGenerationRequest,
        ) -> Result<BTreeMap<String, Vec<GeneratedQuestion>>, GenerationError> {
            let round = self.rounds.fetch_add(1, Ordering::SeqCst);
            if self.panic_on_generate {
                panic!("generator crashed on round {round}");
            }
            if let Some(gate) = &self.generation_gate {
                gate.acquire().await.unwrap().forget();
            }
            if let Some(stall) = self.stall {
                tokio::time::sleep(stall).await;
            }
            if let Some(err) = self.fail_generation.lock().unwrap().clone() {
                return Err(err);
            }

            let short = self.short_type.lock().unwrap().clone();
            let mut out = BTreeMap::new();
            for t in &request.quota.types {
                let mut count = t.question_count as usize;
                if short.as_deref() == Some(t.type_code.as_str()) {
                    count -= 1;
                }
                let questions = (0..count)
                    .map(|i| GeneratedQuestion {
                        question: format!("r{round}-{}-{i}", t.type_code),
                        expected_answer: format!("answer r{round}-{}-{i}", t.type_code),
                        difficulty: None,
                    })
                    .collect();
                out.insert(t.type_code.clone(), questions);
            }
            Ok(out)
        }

        async fn correct_item(&self, request: &CorrectionRequest) -> Result<CorrectedItem, GenerationError> {
            self.correction_entered.notify_one();
            if let Some(gate) = &self.correction_gate {
                gate.notified().await;
            }
            if let Some(err) = self.fail_correction.lock().unwrap().clone() {
                return Err(err);
            }
            Ok(CorrectedItem {
                question: format!("corrected: {}", request.instruction),
                expected_answer: "corrected answer".to_string(),
            })
        }
    }

    fn policy() -> GlobalPolicy {
        GlobalPolicy {
            candidate_multiplier: 2,
            questions_per_candidate: 3,
            distribution: BTreeMap::from([("practice".to_string(), 1), ("theory".to_string(), 2)]),
        }
    }

    fn request(name: &str) -> RoleGenerationRequest {
        let role = RoleDescriptor {
            id: Uuid::new_v4(),
            contract_id: Uuid::nil(),
            name: name.to_string(),
            position_count: 2,
            salary_tier: SalaryTier::Double,
            requirements: Some("Rust, Postgres".to_string()),
        };
        let quota = resolve(&policy(), std::slice::from_ref(&role)).remove(0);
        RoleGenerationRequest {
            quota,
            context: context(&role),
        }
    }

    fn context(role: &RoleDescriptor) -> JobContext {
        JobContext {
            contract_title: "Intake".to_string(),
            general_requirements: None,
            role_name: role.name.clone(),
            role_requirements: role.requirements.clone(),
            salary_tier: role.salary_tier,
            position_count: role.position_count,
        }
    }

    fn orchestrator(generator: ScriptedGenerator) -> (Arc<GenerationOrchestrator>, Arc<ScriptedGenerator>) {
        let generator = Arc::new(generator);
        let orch = GenerationOrchestrator::new(
            generator.clone(),
            ContentPool::new(),
            Duration::from_secs(60),
        );
        (Arc::new(orch), generator)
    }

    fn count_of(items: &[QuestionItem], type_code: &str) -> usize {
        items.iter().filter(|i| i.type_code == type_code).count()
    }

    #[tokio::test]
    async fn test_generate_fills_pool_to_quota() {
        let (orch, _) = orchestrator(ScriptedGenerator::default());
        let req = request("Backend");
        let role_id = req.quota.role_id;
        let quota = req.quota.clone();

        let state = orch.generate_for_role(req, GenerationMode::Initial).await.unwrap();
        assert_eq!(state, GenerationState::Ready);

        let items = orch.pool().get(role_id).await.unwrap();
        assert_eq!(count_of(&items, "theory"), 8);
        assert_eq!(count_of(&items, "practice"), 4);
        assert!(items.iter().all(|i| i.difficulty == "mid-level practitioner"));
        assert_eq!(orch.ready_content(&quota).await.unwrap(), items);
    }

    #[tokio::test]
    async fn test_second_generation_rejected_while_in_flight() {
        let gate = Arc::new(Semaphore::new(0));
        let (orch, _) = orchestrator(ScriptedGenerator {
            generation_gate: Some(gate.clone()),
            ..Default::default()
        });
        let req = request("Backend");
        let role_id = req.quota.role_id;

        let handle = orch
            .spawn_generation(req.clone(), GenerationMode::Initial)
            .await
            .unwrap();
        assert_eq!(orch.state(role_id).await, GenerationState::Generating);

        let err = orch
            .generate_for_role(req.clone(), GenerationMode::Regenerate)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ConcurrentGenerationRejected { role_id: r } if r == role_id));

        gate.add_permits(1);
        assert_eq!(handle.await.unwrap(), GenerationState::Ready);
    }

    #[tokio::test]
    async fn test_panicking_generator_fails_role_instead_of_wedging_it() {
        let (orch, generator) = orchestrator(ScriptedGenerator {
            panic_on_generate: true,
            ..Default::default()
        });
        let req = request("Backend");
        let role_id = req.quota.role_id;

        let handle = orch
            .spawn_generation(req.clone(), GenerationMode::Initial)
            .await
            .unwrap();
        let state = handle.await.unwrap();
        assert!(matches!(
            &state,
            GenerationState::Failed { reason } if reason.starts_with("generation task aborted")
        ));
        assert_eq!(orch.state(role_id).await, state);

        // the role accepts a new attempt
        let retry = orch
            .spawn_generation(req, GenerationMode::Regenerate)
            .await
            .unwrap();
        assert!(matches!(retry.await.unwrap(), GenerationState::Failed { .. }));
        assert_eq!(generator.rounds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_roles_generate_independently() {
        let gate = Arc::new(Semaphore::new(0));
        let (orch, _) = orchestrator(ScriptedGenerator {
            generation_gate: Some(gate.clone()),
            ..Default::default()
        });
        let a = request("A");
        let b = request("B");
        let (a_id, b_id) = (a.quota.role_id, b.quota.role_id);

        let dispatches = orch
            .spawn_for_roles(vec![a.clone(), b], GenerationMode::Initial)
            .await;
        assert!(dispatches.iter().all(|d| d.accepted));

        let again = orch.spawn_for_roles(vec![a], GenerationMode::Initial).await;
        assert!(!again[0].accepted);
        assert_eq!(again[0].state, GenerationState::Generating);

        gate.add_permits(2);
        for _ in 0..200 {
            if orch.state(a_id).await == GenerationState::Ready
                && orch.state(b_id).await == GenerationState::Ready
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(orch.state(a_id).await, GenerationState::Ready);
        assert_eq!(orch.state(b_id).await, GenerationState::Ready);
    }

    #[tokio::test]
    async fn test_ready_content_rejects_changed_quota() {
        let (orch, _) = orchestrator(ScriptedGenerator::default());
        let req = request("Backend");
        orch.generate_for_role(req.clone(), GenerationMode::Initial)
            .await
            .unwrap();

        let mut lowered = req.quota.clone();
        lowered.override_count("theory", 3).unwrap();
        let err = orch.ready_content(&lowered).await.unwrap_err();
        assert!(matches!(err, AppError::IncompleteContent(_)));

        let mut narrowed = req.quota.clone();
        narrowed.types.retain(|t| t.type_code == "theory");
        assert!(matches!(
            orch.ready_content(&narrowed).await,
            Err(AppError::IncompleteContent(_))
        ));

        assert_eq!(orch.ready_content(&req.quota).await.unwrap().len(), 12);
    }

    #[tokio::test]
    async fn test_initial_generation_refused_when_ready() {
        let (orch, _) = orchestrator(ScriptedGenerator::default());
        let req = request("Backend");
        orch.generate_for_role(req.clone(), GenerationMode::Initial)
            .await
            .unwrap();

        let err = orch
            .generate_for_role(req.clone(), GenerationMode::Initial)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(
            orch.regenerate_for_role(req).await.unwrap(),
            GenerationState::Ready
        );
    }

    #[tokio::test]
    async fn test_failed_regeneration_keeps_prior_content() {
        let (orch, generator) = orchestrator(ScriptedGenerator::default());
        let req = request("Backend");
        let role_id = req.quota.role_id;
        orch.generate_for_role(req.clone(), GenerationMode::Initial)
            .await
            .unwrap();
        let before = orch.pool().get(role_id).await.unwrap();

        *generator.fail_generation.lock().unwrap() =
            Some(GenerationError::Backend("503 upstream".to_string()));
        let state = orch.regenerate_for_role(req.clone()).await.unwrap();

        assert_eq!(
            state,
            GenerationState::Failed {
                reason: "backend error: 503 upstream".to_string()
            }
        );
        assert_eq!(orch.pool().get(role_id).await.unwrap(), before);
        assert!(matches!(
            orch.ready_content(&req.quota).await,
            Err(AppError::IncompleteContent(_))
        ));

        // explicit retry recovers
        *generator.fail_generation.lock().unwrap() = None;
        assert_eq!(orch.regenerate_for_role(req).await.unwrap(), GenerationState::Ready);
    }

    #[tokio::test]
    async fn test_short_output_is_a_failure_not_partial_content() {
        let (orch, generator) = orchestrator(ScriptedGenerator::default());
        *generator.short_type.lock().unwrap() = Some("theory".to_string());
        let req = request("Backend");
        let role_id = req.quota.role_id;

        let state = orch.generate_for_role(req, GenerationMode::Initial).await.unwrap();
        assert_eq!(
            state,
            GenerationState::Failed {
                reason: "theory: expected 8 items, got 7".to_string()
            }
        );
        assert!(orch.pool().get(role_id).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_collaborator_timeout_fails_role() {
        let (orch, _) = orchestrator(ScriptedGenerator {
            stall: Some(Duration::from_secs(600)),
            ..Default::default()
        });
        let state = orch
            .generate_for_role(request("Backend"), GenerationMode::Initial)
            .await
            .unwrap();
        assert_eq!(
            state,
            GenerationState::Failed {
                reason: "timeout after 60s".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_empty_quota_is_not_generated() {
        let (orch, generator) = orchestrator(ScriptedGenerator::default());
        let mut req = request("Backend");
        req.quota.types.clear();
        let err = orch
            .generate_for_role(req, GenerationMode::Initial)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(generator.rounds.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_correct_before_generation_is_incomplete_content() {
        let (orch, _) = orchestrator(ScriptedGenerator::default());
        let req = request("Backend");
        let err = orch
            .correct_single_item(req.quota.role_id, "theory", 0, "simpler", req.context)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::IncompleteContent(_)));
    }

    #[tokio::test]
    async fn test_correction_changes_exactly_one_item() {
        let (orch, _) = orchestrator(ScriptedGenerator::default());
        let a = request("A");
        let b = request("B");
        let (a_id, b_id) = (a.quota.role_id, b.quota.role_id);
        orch.generate_for_role(a.clone(), GenerationMode::Initial)
            .await
            .unwrap();
        orch.generate_for_role(b, GenerationMode::Initial).await.unwrap();
        let a_before = orch.pool().get(a_id).await.unwrap();
        let b_before = orch.pool().get(b_id).await.unwrap();

        let corrected = orch
            .correct_single_item(a_id, "theory", 1, "ask about indexing", a.context)
            .await
            .unwrap();
        assert_eq!(corrected.question, "corrected: ask about indexing");
        assert_eq!(corrected.ordinal, 1);

        let a_after = orch.pool().get(a_id).await.unwrap();
        let changed: Vec<_> = a_before
            .iter()
            .zip(&a_after)
            .filter(|(x, y)| x != y)
            .map(|(_, y)| y.key())
            .collect();
        assert_eq!(changed, vec![("theory", 1)]);
        assert_eq!(orch.pool().get(b_id).await.unwrap(), b_before);
    }

    #[tokio::test]
    async fn test_failed_correction_keeps_item() {
        let (orch, generator) = orchestrator(ScriptedGenerator::default());
        let req = request("Backend");
        let role_id = req.quota.role_id;
        orch.generate_for_role(req.clone(), GenerationMode::Initial)
            .await
            .unwrap();
        let before = orch.pool().get(role_id).await.unwrap();

        *generator.fail_correction.lock().unwrap() =
            Some(GenerationError::Malformed("not json".to_string()));
        let err = orch
            .correct_single_item(role_id, "practice", 0, "harder", req.context)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::GenerationFailure(_)));
        assert_eq!(orch.pool().get(role_id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_regeneration_supersedes_in_flight_correction() {
        let gate = Arc::new(Notify::new());
        let (orch, generator) = orchestrator(ScriptedGenerator {
            correction_gate: Some(gate.clone()),
            ..Default::default()
        });
        let req = request("Backend");
        let role_id = req.quota.role_id;
        orch.generate_for_role(req.clone(), GenerationMode::Initial)
            .await
            .unwrap();

        let correcting = {
            let orch = Arc::clone(&orch);
            let context = req.context.clone();
            tokio::spawn(async move {
                orch.correct_single_item(role_id, "theory", 0, "shorter", context)
                    .await
            })
        };
        generator.correction_entered.notified().await;

        orch.regenerate_for_role(req).await.unwrap();
        let regenerated = orch.pool().get(role_id).await.unwrap();

        gate.notify_one();
        let err = correcting.await.unwrap().unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(orch.pool().get(role_id).await.unwrap(), regenerated);
        assert!(regenerated.iter().all(|i| i.question.starts_with("r1-")));
    }
}
