//! API Handler for configstore
//!
//! Owns the store accessor and every component built on top of it. The
//! HTTP routes and the offline CLI commands both go through this type, so
//! logging, metrics and precondition checks live in one place.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::entity::EntityStore;
use crate::export::{export_to, ExportError, ExportSummary};
use crate::import::{ImportError, ImportOptions, ImportSummary, Importer};
use crate::maintenance::{
    self, bootstrap_controller, ConvergenceLoop, MaintenanceError, MaintenanceFlag,
    MaintenanceStatus, ModeController,
};
use crate::observability::{log_event_with_fields, Event, Logger, MetricsRegistry, ObservationScope};
use crate::storage::StoreAccessor;
use crate::stream::CancelFlag;

use super::errors::{ApiError, ApiResult};

pub struct ApiHandler {
    store: Arc<dyn StoreAccessor>,
    flag: MaintenanceFlag,
    controller: Arc<ModeController>,
    entities: EntityStore,
    metrics: Arc<MetricsRegistry>,
    dump_slot: Arc<AtomicBool>,
}

impl ApiHandler {
    /// Wire up all components, deriving the initial mode from the
    /// persisted flag.
    pub fn bootstrap(store: Arc<dyn StoreAccessor>) -> ApiResult<Self> {
        let metrics = Arc::new(MetricsRegistry::new());
        let flag = MaintenanceFlag::new(Arc::clone(&store));
        let controller = bootstrap_controller(&flag, Arc::clone(&metrics))?;
        let entities = EntityStore::new(Arc::clone(&store), Arc::clone(&controller));

        Ok(Self {
            store,
            flag,
            controller,
            entities,
            metrics,
            dump_slot: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn controller(&self) -> &Arc<ModeController> {
        &self.controller
    }

    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// A convergence loop bound to this handler's flag and controller
    pub fn convergence_loop(&self) -> ConvergenceLoop {
        ConvergenceLoop::new(self.flag.clone(), Arc::clone(&self.controller))
    }

    pub fn maintenance_status(&self) -> ApiResult<MaintenanceStatus> {
        Ok(maintenance::status(&self.flag, &self.controller)?)
    }

    /// Persist the requested mode. Returns without waiting for convergence.
    pub fn set_maintenance(&self, enable: bool) -> ApiResult<()> {
        self.flag
            .set_requested(enable)
            .map_err(MaintenanceError::from)?;
        log_event_with_fields(
            Event::MaintenanceRequested,
            &[("enabled", if enable { "true" } else { "false" })],
        );
        self.controller.nudge();
        Ok(())
    }

    /// Claim the single export/import slot
    pub fn begin_dump(&self) -> ApiResult<DumpPermit> {
        self.dump_slot
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ApiError::DumpInProgress)?;
        Ok(DumpPermit {
            slot: Arc::clone(&self.dump_slot),
        })
    }

    /// Stream a full dump into `sink`.
    ///
    /// Runs in any mode; outside Maintenance the dump may interleave with
    /// concurrent writes and a warning is logged.
    pub fn export<W: Write>(
        &self,
        _permit: &DumpPermit,
        sink: W,
        cancel: &CancelFlag,
    ) -> Result<ExportSummary, ExportError> {
        let mode = self.controller.mode();
        if !mode.is_maintenance() {
            Logger::warn(Event::ExportNotQuiesced.as_str(), &[("mode", mode.name())]);
        }

        let scope = ObservationScope::begin(
            Event::ExportBegin,
            Event::ExportComplete,
            Event::ExportAborted,
            &[("mode", mode.name())],
        );

        match export_to(self.store.as_ref(), sink, cancel) {
            Ok(summary) => {
                self.metrics.record_export_completed(summary.entities);
                scope.complete(&[
                    ("entities", &summary.entities.to_string()),
                    ("bytes", &summary.bytes.to_string()),
                    ("digest", &summary.digest),
                ]);
                Ok(summary)
            }
            Err(e) => {
                self.metrics.increment_exports_aborted();
                scope.fail(&e.to_string(), &[("code", e.code())]);
                Err(e)
            }
        }
    }

    /// Replay a dump into the store. Requires the current mode to be
    /// Maintenance for the whole run.
    pub fn import<R: Read>(
        &self,
        _permit: &DumpPermit,
        source: R,
        options: ImportOptions,
        cancel: CancelFlag,
    ) -> ApiResult<ImportSummary> {
        let mode = self.controller.mode();
        if !mode.is_maintenance() {
            return Err(ImportError::NotInMaintenance { mode }.into());
        }

        let scope = ObservationScope::begin(
            Event::ImportBegin,
            Event::ImportComplete,
            Event::ImportFailed,
            &[("reset", if options.reset { "true" } else { "false" })],
        );

        let mut importer =
            Importer::new(self.store.as_ref(), cancel).within_maintenance(&self.controller);
        match importer.run(source, options) {
            Ok(summary) => {
                self.metrics.record_import_completed(summary.entities);
                scope.complete(&[
                    ("entities", &summary.entities.to_string()),
                    ("digest", &summary.digest),
                ]);
                Ok(summary)
            }
            Err(e) => {
                let committed = importer.committed();
                self.metrics.record_import_failed(committed);
                scope.fail(
                    &e.to_string(),
                    &[("code", e.code()), ("committed", &committed.to_string())],
                );
                Err(e.into())
            }
        }
    }
}

/// Holds the dump slot until dropped
pub struct DumpPermit {
    slot: Arc<AtomicBool>,
}

impl Drop for DumpPermit {
    fn drop(&mut self) {
        self.slot.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityKind, NewEntity};
    use crate::maintenance::Mode;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn handler() -> ApiHandler {
        ApiHandler::bootstrap(Arc::new(MemoryStore::new())).unwrap()
    }

    fn user(id: &str) -> NewEntity {
        NewEntity {
            kind: EntityKind::User,
            id: Some(id.to_string()),
            refs: vec![],
            data: json!({}),
        }
    }

    #[test]
    fn test_enable_is_idempotent_and_not_immediate() {
        let api = handler();
        api.set_maintenance(true).unwrap();
        api.set_maintenance(true).unwrap();

        let status = api.maintenance_status().unwrap();
        assert!(status.requested);
        assert!(!status.current);

        api.convergence_loop().reconcile_once();
        assert!(api.maintenance_status().unwrap().current);
    }

    #[test]
    fn test_single_dump_slot() {
        let api = handler();
        let permit = api.begin_dump().unwrap();
        assert!(matches!(api.begin_dump(), Err(ApiError::DumpInProgress)));
        drop(permit);
        assert!(api.begin_dump().is_ok());
    }

    #[test]
    fn test_import_requires_current_maintenance() {
        let api = handler();
        // Requested only; the loop has not reconciled yet
        api.set_maintenance(true).unwrap();
        let permit = api.begin_dump().unwrap();
        let err = api
            .import(&permit, &[][..], ImportOptions::default(), CancelFlag::new())
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Import(ImportError::NotInMaintenance {
                mode: Mode::Normal
            })
        ));
    }

    #[test]
    fn test_export_then_import_roundtrip_and_metrics() {
        let source = handler();
        source.entities().create(user("alice")).unwrap();
        let permit = source.begin_dump().unwrap();
        let mut dump = Vec::new();
        source.export(&permit, &mut dump, &CancelFlag::new()).unwrap();
        assert_eq!(source.metrics().snapshot().exports_completed, 1);

        let target = handler();
        target.set_maintenance(true).unwrap();
        target.convergence_loop().reconcile_once();
        let permit = target.begin_dump().unwrap();
        let summary = target
            .import(&permit, dump.as_slice(), ImportOptions::default(), CancelFlag::new())
            .unwrap();
        assert_eq!(summary.entities, 1);
        assert_eq!(target.metrics().snapshot().entities_imported, 1);

        // Still in maintenance: ordinary writes are refused
        assert!(target.entities().create(user("bob")).is_err());
    }
}
