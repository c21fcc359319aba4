//! Per-pipeline provenance state and the submodel handlers

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::{ApplyError, ApplyOutcome, ApplyResult};
use crate::event::{MetricSample, TupleOutput, UpdateEvent, UpdatePayload};
use crate::graph::{
    ActivityPayload, AgentPayload, ElementId, ElementKind, EntityPayload, GraphStore, RelationKind,
};
use crate::index::{ExternalId, LiveIndex};
use crate::ledger::IdentityLedger;
use crate::observability::{Event, Logger, Severity};
use crate::registry::VersionRegistry;

/// Engine configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineConfig {
    /// Fold a new pipeline version automatically once this many structural
    /// events have accumulated since the last fold. `None` disables
    /// automatic folding; explicit folds always remain available.
    pub auto_fold_after: Option<u32>,
    /// Emit structured log lines for applied, ignored, and rejected
    /// events. Logging never changes engine behavior.
    pub logging: bool,
}

/// The provenance state of a single pipeline.
///
/// Owns the graph arena, the live reference index, the identity ledger,
/// and the version registry. One logical writer: events apply strictly
/// sequentially through `&mut self`.
#[derive(Debug, Clone)]
pub struct PipelineProvenance {
    pipeline_id: u64,
    config: EngineConfig,
    graph: GraphStore,
    index: LiveIndex,
    ledger: IdentityLedger,
    registry: VersionRegistry,
    /// Agent representing the pipeline itself
    pipeline_agent: ElementId,
    /// Agents representing operator instances, created on first execution
    operator_agents: HashMap<i64, ElementId>,
}

impl PipelineProvenance {
    /// Creates empty provenance state for the given pipeline.
    pub fn new(pipeline_id: u64) -> Self {
        Self::with_config(pipeline_id, EngineConfig::default())
    }

    /// Creates empty provenance state with the given configuration.
    pub fn with_config(pipeline_id: u64, config: EngineConfig) -> Self {
        let mut graph = GraphStore::new();
        let pipeline_agent = graph.push_element(
            Utc::now(),
            ElementKind::Agent(AgentPayload::Pipeline { pipeline_id }),
        );

        Self {
            pipeline_id,
            config,
            graph,
            index: LiveIndex::new(),
            ledger: IdentityLedger::new(),
            registry: VersionRegistry::new(),
            pipeline_agent,
            operator_agents: HashMap::new(),
        }
    }

    /// Returns the pipeline id this state belongs to.
    pub fn pipeline_id(&self) -> u64 {
        self.pipeline_id
    }

    /// Returns the accumulated graph.
    pub fn graph(&self) -> &GraphStore {
        &self.graph
    }

    pub(crate) fn index(&self) -> &LiveIndex {
        &self.index
    }

    pub(crate) fn registry(&self) -> &VersionRegistry {
        &self.registry
    }

    /// Applies one update event.
    ///
    /// Dispatches by kind to the matching submodel handler. A duplicate
    /// `uniqueID` is an idempotent no-op. Any error leaves the state
    /// exactly as before the call.
    pub fn apply(&mut self, event: &UpdateEvent) -> ApplyResult<ApplyOutcome> {
        event.validate()?;

        if self.ledger.is_seen(&event.unique_id) {
            self.log(
                Severity::Info,
                Event::DuplicateIgnored,
                &event.unique_id,
                event.update_type(),
            );
            return Ok(ApplyOutcome::DuplicateIgnored);
        }

        let at = event.event_time();
        let result = match &event.payload {
            UpdatePayload::PipelineVersionCreation => {
                self.fold_version_at(at);
                Ok(())
            }
            UpdatePayload::OperatorCreation {
                op_id,
                op_name,
                op_data,
            } => self.apply_operator_creation(event, at, *op_id, op_name, op_data),
            UpdatePayload::OperatorModification { op_id, op_data } => {
                self.apply_operator_modification(event, at, *op_id, op_data)
            }
            UpdatePayload::OperatorDeletion { op_id } => {
                self.apply_operator_deletion(event, at, *op_id)
            }
            UpdatePayload::ConnectionCreation {
                con_id,
                from_op_id,
                to_op_id,
                from_sock_id,
                to_sock_id,
            } => self.apply_connection_creation(
                event,
                at,
                *con_id,
                *from_op_id,
                *to_op_id,
                *from_sock_id,
                *to_sock_id,
            ),
            UpdatePayload::ConnectionDeletion { con_id } => {
                self.apply_connection_deletion(event, at, *con_id)
            }
            UpdatePayload::OperatorExecution {
                op_id,
                exec_id,
                inputs,
                outputs,
                metrics,
            } => self.apply_operator_execution(
                event,
                at,
                *op_id,
                exec_id.as_deref(),
                inputs,
                outputs,
                metrics,
            ),
        };

        if let Err(err) = result {
            self.log(
                Severity::Warn,
                Event::EventRejected,
                &event.unique_id,
                event.update_type(),
            );
            return Err(err);
        }

        if event.payload.is_structural() {
            self.registry.note_structural();
            if let Some(threshold) = self.config.auto_fold_after {
                if self.registry.structural_since_fold() >= threshold {
                    self.fold_version_at(at);
                }
            }
        }

        self.ledger.record(event.unique_id.clone());
        self.log(
            Severity::Info,
            Event::EventApplied,
            &event.unique_id,
            event.update_type(),
        );
        Ok(ApplyOutcome::Applied)
    }

    /// Folds the current live structure into a new pipeline version and
    /// returns its number.
    pub fn fold_version(&mut self) -> u64 {
        self.fold_version_at(Utc::now())
    }

    fn fold_version_at(&mut self, at: DateTime<Utc>) -> u64 {
        let version =
            self.registry
                .fold(&mut self.graph, &self.index, self.pipeline_agent, at);
        if self.config.logging {
            Logger::log(
                Severity::Info,
                Event::VersionFolded.as_str(),
                &[
                    ("pipeline_id", &self.pipeline_id.to_string()),
                    ("version", &version.to_string()),
                ],
            );
        }
        version
    }

    // === Submodel handlers ===
    //
    // Each handler checks every precondition before the first write.

    fn apply_operator_creation(
        &mut self,
        event: &UpdateEvent,
        at: DateTime<Utc>,
        op_id: i64,
        op_name: &str,
        op_data: &BTreeMap<String, Value>,
    ) -> ApplyResult<()> {
        let reference = ExternalId::Operator(op_id);
        if self.index.state(&reference).is_some() {
            // Live or tombstoned; deletions are terminal, so the id is
            // occupied either way.
            return Err(ApplyError::conflict(
                &event.unique_id,
                event.update_type(),
                reference.to_string(),
            ));
        }

        let activity = self.graph.push_element(
            at,
            ElementKind::Activity(ActivityPayload::OperatorCreation { op_id }),
        );
        self.graph
            .push_relation(RelationKind::WasAssociatedWith, activity, self.pipeline_agent);

        let entity = self.graph.push_element(
            at,
            ElementKind::Entity(EntityPayload::OperatorVersion {
                op_id,
                name: op_name.to_string(),
                config: op_data.clone(),
                version: 1,
            }),
        );
        self.graph
            .push_relation(RelationKind::WasGeneratedBy, entity, activity);

        self.index.set_live(reference, entity);
        Ok(())
    }

    fn apply_operator_modification(
        &mut self,
        event: &UpdateEvent,
        at: DateTime<Utc>,
        op_id: i64,
        op_data: &BTreeMap<String, Value>,
    ) -> ApplyResult<()> {
        let reference = ExternalId::Operator(op_id);
        let previous = self.index.live(&reference).ok_or_else(|| {
            ApplyError::unknown_reference(
                &event.unique_id,
                event.update_type(),
                reference.to_string(),
            )
        })?;

        let (name, mut config, version) = self.operator_version_data(previous);
        for (key, value) in op_data {
            config.insert(key.clone(), value.clone());
        }

        let activity = self.graph.push_element(
            at,
            ElementKind::Activity(ActivityPayload::OperatorModification { op_id }),
        );
        self.graph
            .push_relation(RelationKind::WasAssociatedWith, activity, self.pipeline_agent);
        self.graph
            .push_relation(RelationKind::Used, activity, previous);

        let entity = self.graph.push_element(
            at,
            ElementKind::Entity(EntityPayload::OperatorVersion {
                op_id,
                name,
                config,
                version: version + 1,
            }),
        );
        self.graph
            .push_relation(RelationKind::WasGeneratedBy, entity, activity);
        self.graph
            .push_relation(RelationKind::WasDerivedFrom, entity, previous);
        // The previous version stays in history but is no longer live.
        self.graph
            .push_relation(RelationKind::WasInvalidatedBy, previous, activity);

        self.index.set_live(reference, entity);
        Ok(())
    }

    fn apply_operator_deletion(
        &mut self,
        event: &UpdateEvent,
        at: DateTime<Utc>,
        op_id: i64,
    ) -> ApplyResult<()> {
        let reference = ExternalId::Operator(op_id);
        let current = self.index.live(&reference).ok_or_else(|| {
            ApplyError::unknown_reference(
                &event.unique_id,
                event.update_type(),
                reference.to_string(),
            )
        })?;

        let activity = self.graph.push_element(
            at,
            ElementKind::Activity(ActivityPayload::OperatorDeletion { op_id }),
        );
        self.graph
            .push_relation(RelationKind::WasAssociatedWith, activity, self.pipeline_agent);
        self.graph
            .push_relation(RelationKind::WasInvalidatedBy, current, activity);

        self.index.tombstone(reference, current);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_connection_creation(
        &mut self,
        event: &UpdateEvent,
        at: DateTime<Utc>,
        con_id: i64,
        from_op_id: i64,
        to_op_id: i64,
        from_sock_id: i64,
        to_sock_id: i64,
    ) -> ApplyResult<()> {
        let reference = ExternalId::Connection(con_id);
        if self.index.state(&reference).is_some() {
            return Err(ApplyError::conflict(
                &event.unique_id,
                event.update_type(),
                reference.to_string(),
            ));
        }

        let from_entity = self.live_operator(event, from_op_id)?;
        let to_entity = self.live_operator(event, to_op_id)?;

        let activity = self.graph.push_element(
            at,
            ElementKind::Activity(ActivityPayload::ConnectionCreation { con_id }),
        );
        self.graph
            .push_relation(RelationKind::WasAssociatedWith, activity, self.pipeline_agent);
        self.graph
            .push_relation(RelationKind::Used, activity, from_entity);
        self.graph
            .push_relation(RelationKind::Used, activity, to_entity);

        let entity = self.graph.push_element(
            at,
            ElementKind::Entity(EntityPayload::ConnectionVersion {
                con_id,
                from_op_id,
                to_op_id,
                from_sock_id,
                to_sock_id,
                version: 1,
            }),
        );
        self.graph
            .push_relation(RelationKind::WasGeneratedBy, entity, activity);

        self.index.set_live(reference, entity);
        Ok(())
    }

    fn apply_connection_deletion(
        &mut self,
        event: &UpdateEvent,
        at: DateTime<Utc>,
        con_id: i64,
    ) -> ApplyResult<()> {
        let reference = ExternalId::Connection(con_id);
        let current = self.index.live(&reference).ok_or_else(|| {
            ApplyError::unknown_reference(
                &event.unique_id,
                event.update_type(),
                reference.to_string(),
            )
        })?;

        let activity = self.graph.push_element(
            at,
            ElementKind::Activity(ActivityPayload::ConnectionDeletion { con_id }),
        );
        self.graph
            .push_relation(RelationKind::WasAssociatedWith, activity, self.pipeline_agent);
        self.graph
            .push_relation(RelationKind::WasInvalidatedBy, current, activity);

        self.index.tombstone(reference, current);
        Ok(())
    }

    fn apply_operator_execution(
        &mut self,
        event: &UpdateEvent,
        at: DateTime<Utc>,
        op_id: i64,
        exec_id: Option<&str>,
        inputs: &[String],
        outputs: &[TupleOutput],
        metrics: &[MetricSample],
    ) -> ApplyResult<()> {
        let operator_entity = self.live_operator(event, op_id)?;

        // Resolve every consumed tuple before any write.
        let mut input_entities = Vec::with_capacity(inputs.len());
        for tuple_id in inputs {
            let reference = ExternalId::Tuple(tuple_id.clone());
            let entity = self.index.live(&reference).ok_or_else(|| {
                ApplyError::unknown_reference(
                    &event.unique_id,
                    event.update_type(),
                    reference.to_string(),
                )
            })?;
            input_entities.push(entity);
        }

        // Produced tuple ids must be fresh, including within this event.
        let mut fresh = HashSet::new();
        for output in outputs {
            let reference = ExternalId::Tuple(output.tuple_id.clone());
            if self.index.state(&reference).is_some() || !fresh.insert(&output.tuple_id) {
                return Err(ApplyError::conflict(
                    &event.unique_id,
                    event.update_type(),
                    reference.to_string(),
                ));
            }
        }

        let agent = self.operator_agent(at, op_id);
        let exec_id = exec_id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let activity = self.graph.push_element(
            at,
            ElementKind::Activity(ActivityPayload::OperatorExecution {
                op_id,
                exec_id,
                metrics: metrics.to_vec(),
            }),
        );
        self.graph
            .push_relation(RelationKind::WasAssociatedWith, activity, agent);
        self.graph
            .push_relation(RelationKind::Used, activity, operator_entity);

        for entity in input_entities {
            self.graph.push_relation(RelationKind::Used, activity, entity);
        }

        for output in outputs {
            let entity = self.graph.push_element(
                at,
                ElementKind::Entity(EntityPayload::Tuple {
                    tuple_id: output.tuple_id.clone(),
                    data: output.data.clone(),
                }),
            );
            self.graph
                .push_relation(RelationKind::WasGeneratedBy, entity, activity);
            self.index
                .set_live(ExternalId::Tuple(output.tuple_id.clone()), entity);
        }

        Ok(())
    }

    // === Helpers ===

    fn live_operator(&self, event: &UpdateEvent, op_id: i64) -> ApplyResult<ElementId> {
        let reference = ExternalId::Operator(op_id);
        self.index.live(&reference).ok_or_else(|| {
            ApplyError::unknown_reference(
                &event.unique_id,
                event.update_type(),
                reference.to_string(),
            )
        })
    }

    fn operator_version_data(
        &self,
        element: ElementId,
    ) -> (String, BTreeMap<String, Value>, u32) {
        match self.graph.element(element).as_entity() {
            Some(EntityPayload::OperatorVersion {
                name,
                config,
                version,
                ..
            }) => (name.clone(), config.clone(), *version),
            // The index only registers operator versions under operator keys.
            other => unreachable!("operator key resolved to {:?}", other),
        }
    }

    fn operator_agent(&mut self, at: DateTime<Utc>, op_id: i64) -> ElementId {
        if let Some(agent) = self.operator_agents.get(&op_id) {
            return *agent;
        }
        let agent = self.graph.push_element(
            at,
            ElementKind::Agent(AgentPayload::OperatorInstance { op_id }),
        );
        self.operator_agents.insert(op_id, agent);
        agent
    }

    fn log(&self, severity: Severity, event: Event, unique_id: &str, update_type: &str) {
        if self.config.logging {
            Logger::log(
                severity,
                event.as_str(),
                &[
                    ("pipeline_id", &self.pipeline_id.to_string()),
                    ("unique_id", unique_id),
                    ("update_type", update_type),
                ],
            );
        }
    }
}
