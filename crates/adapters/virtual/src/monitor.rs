//! Virtual geofence monitor.
//!
//! Tracks a simulated position and posts enter/exit transitions for the
//! watched regions as it moves. Regions the device is already inside when
//! they get registered produce an immediate enter, like an initial-enter
//! trigger on a real platform.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use hush_app::dispatcher::DispatcherHandle;
use hush_app::ports::RegionMonitorPort;
use hush_domain::error::{HushError, RegistrationError};
use hush_domain::region::{RegionKey, RegionRegistration, Transition};
use hush_domain::rule::GeoPoint;

struct MonitorState {
    regions: BTreeMap<RegionKey, RegionRegistration>,
    inside: BTreeSet<RegionKey>,
    position: Option<GeoPoint>,
    permission: bool,
    provider_enabled: bool,
}

pub struct VirtualRegionMonitor {
    dispatcher: DispatcherHandle,
    capacity: usize,
    state: Mutex<MonitorState>,
}

impl VirtualRegionMonitor {
    #[must_use]
    pub fn new(dispatcher: DispatcherHandle, capacity: usize) -> Self {
        Self {
            dispatcher,
            capacity,
            state: Mutex::new(MonitorState {
                regions: BTreeMap::new(),
                inside: BTreeSet::new(),
                position: None,
                permission: true,
                provider_enabled: true,
            }),
        }
    }

    /// Regions currently watched, ordered by key.
    #[must_use]
    pub fn watched(&self) -> Vec<RegionRegistration> {
        self.lock().regions.values().cloned().collect()
    }

    /// Grant or revoke location access. Revoking keeps the current set until
    /// the next submission, which then fails.
    pub fn set_permission(&self, granted: bool) {
        self.lock().permission = granted;
    }

    /// Switch the location provider on or off and report the change.
    ///
    /// While the provider is off, movement produces no transitions.
    pub fn set_provider_enabled(&self, enabled: bool) {
        let changed = {
            let mut state = self.lock();
            let changed = state.provider_enabled != enabled;
            state.provider_enabled = enabled;
            changed
        };
        if changed {
            self.dispatcher
                .on_region_provider_availability_changed(enabled);
        }
    }

    /// Report a monitor error instead of a transition.
    pub fn report_error(&self, code: i32) {
        tracing::warn!(code, "virtual region monitor error");
        self.dispatcher.on_region_monitor_error(code);
    }

    /// Move the device and post a transition for every boundary crossed.
    pub fn move_to(&self, position: GeoPoint) {
        let mut state = self.lock();
        state.position = Some(position);
        if !state.provider_enabled {
            return;
        }
        let mut crossings = Vec::new();
        let MonitorState {
            regions, inside, ..
        } = &mut *state;
        for (key, region) in regions.iter() {
            let now_inside = region.contains(position);
            if now_inside && inside.insert(key.clone()) {
                crossings.push((key.clone(), Transition::Enter));
            } else if !now_inside && inside.remove(key) {
                crossings.push((key.clone(), Transition::Exit));
            }
        }
        drop(state);
        for (key, transition) in crossings {
            tracing::debug!(%key, %transition, "virtual region transition");
            self.dispatcher.on_region_transition(key, transition);
        }
    }

    /// Forget every watched region, as a reboot does.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.regions.clear();
        state.inside.clear();
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace(&self, regions: Vec<RegionRegistration>) -> Result<(), HushError> {
        let mut state = self.lock();
        if !state.permission {
            return Err(RegistrationError::PermissionMissing.into());
        }
        if regions.len() > self.capacity {
            return Err(RegistrationError::CapacityExceeded {
                capacity: self.capacity,
            }
            .into());
        }

        state.regions = regions
            .into_iter()
            .map(|region| (region.key.clone(), region))
            .collect();
        let previously_inside = std::mem::take(&mut state.inside);
        let inside: BTreeSet<RegionKey> = match (state.position, state.provider_enabled) {
            (Some(position), true) => state
                .regions
                .values()
                .filter(|region| region.contains(position))
                .map(|region| region.key.clone())
                .collect(),
            _ => BTreeSet::new(),
        };
        let entered: Vec<RegionKey> = inside.difference(&previously_inside).cloned().collect();
        state.inside = inside;
        drop(state);

        for key in entered {
            self.dispatcher.on_region_transition(key, Transition::Enter);
        }
        Ok(())
    }
}

impl RegionMonitorPort for VirtualRegionMonitor {
    fn set_watched_regions(
        &self,
        regions: Vec<RegionRegistration>,
    ) -> impl Future<Output = Result<(), HushError>> + Send {
        let result = self.replace(regions);
        async { result }
    }

    fn permission_granted(&self) -> impl Future<Output = bool> + Send {
        let granted = self.lock().permission;
        async move { granted }
    }
}
