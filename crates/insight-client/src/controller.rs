use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use insight_protocol::{FilterCatalog, FilterField, SelectedFilters};
use insight_shape::{DashboardView, ZeroMetric};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::DashboardApi;
use crate::state::{FilterState, Selection};

/// What the dashboard should currently show.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Loading,
    Ready(DashboardView),
    NoData,
    Unavailable(String),
}

#[derive(Debug, Clone, Default)]
pub struct ControllerOptions {
    pub zero_metric: ZeroMetric,
    /// Selection used for the first query.
    pub initial_filters: SelectedFilters,
}

struct Shared {
    filters: FilterState,
    latest_ticket: u64,
}

struct Inner<A> {
    api: A,
    options: ControllerOptions,
    catalog: FilterCatalog,
    shared: Mutex<Shared>,
    view: watch::Sender<ViewState>,
}

impl<A> Inner<A> {
    fn shared(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns the filter selection and issues one query per change.
///
/// Each query is tagged with a ticket; a response is applied only while its
/// ticket is still the newest one issued, so a slow stale response can never
/// overwrite a fresher view.
pub struct DashboardController<A> {
    inner: Arc<Inner<A>>,
}

impl<A> Clone for DashboardController<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: DashboardApi> DashboardController<A> {
    /// Fetch the catalog once and kick off the initial query.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(api: A, options: ControllerOptions) -> Self {
        let catalog = match api.catalog().await {
            Ok(catalog) => catalog,
            Err(err) => {
                warn!(%err, "filter catalog unavailable; continuing without options");
                FilterCatalog::new()
            }
        };
        let filters = FilterState::from(options.initial_filters.clone());
        let (view, _) = watch::channel(ViewState::Loading);
        let controller = Self {
            inner: Arc::new(Inner {
                api,
                options,
                catalog,
                shared: Mutex::new(Shared {
                    filters,
                    latest_ticket: 0,
                }),
                view,
            }),
        };
        controller.refresh();
        controller
    }

    pub fn catalog(&self) -> &FilterCatalog {
        &self.inner.catalog
    }

    pub fn filters(&self) -> SelectedFilters {
        self.inner.shared().filters.selected().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.inner.view.subscribe()
    }

    pub fn current(&self) -> ViewState {
        self.inner.view.borrow().clone()
    }

    pub fn set_filter(&self, field: FilterField, selection: Selection) -> JoinHandle<()> {
        self.mutate(|filters| filters.set(field, selection))
    }

    pub fn clear_filter(&self, field: FilterField) -> JoinHandle<()> {
        self.mutate(|filters| filters.set(field, Selection::All))
    }

    pub fn reset(&self) -> JoinHandle<()> {
        self.mutate(FilterState::reset)
    }

    /// Re-run the query for the current selection.
    pub fn refresh(&self) -> JoinHandle<()> {
        self.mutate(|_| {})
    }

    fn mutate(&self, change: impl FnOnce(&mut FilterState)) -> JoinHandle<()> {
        let (ticket, filters) = {
            let mut shared = self.inner.shared();
            change(&mut shared.filters);
            shared.latest_ticket += 1;
            self.inner.view.send_replace(ViewState::Loading);
            (shared.latest_ticket, shared.filters.selected().clone())
        };
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let outcome = inner.api.query(&filters).await;
            let shared = inner.shared();
            if shared.latest_ticket != ticket {
                debug!(ticket, latest = shared.latest_ticket, "discarding stale dashboard response");
                return;
            }
            let next = match outcome {
                Ok(records) if records.is_empty() => ViewState::NoData,
                Ok(records) => {
                    ViewState::Ready(DashboardView::from_records(&records, inner.options.zero_metric))
                }
                Err(err) => {
                    warn!(%err, "dashboard query failed");
                    ViewState::Unavailable(err.message())
                }
            };
            inner.view.send_replace(next);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ClientError;
    use async_trait::async_trait;
    use insight_protocol::Record;
    use std::collections::HashMap;
    use tokio::sync::oneshot;

    type Reply = Result<Vec<Record>, ClientError>;

    /// Each query blocks until the test releases the reply keyed by its sector filter.
    struct GatedApi {
        catalog: Result<FilterCatalog, u16>,
        gates: Mutex<HashMap<String, oneshot::Receiver<Reply>>>,
        seen: Mutex<Vec<SelectedFilters>>,
    }

    impl GatedApi {
        fn new(keys: &[&str]) -> (Self, HashMap<String, oneshot::Sender<Reply>>) {
            let mut gates = HashMap::new();
            let mut senders = HashMap::new();
            for key in keys {
                let (tx, rx) = oneshot::channel();
                gates.insert(key.to_string(), rx);
                senders.insert(key.to_string(), tx);
            }
            let mut catalog = FilterCatalog::new();
            catalog.insert(FilterField::Sector, vec!["Energy".into()]);
            let api = Self {
                catalog: Ok(catalog),
                gates: Mutex::new(gates),
                seen: Mutex::new(Vec::new()),
            };
            (api, senders)
        }
    }

    #[async_trait]
    impl DashboardApi for GatedApi {
        async fn catalog(&self) -> Result<FilterCatalog, ClientError> {
            self.catalog.clone().map_err(|status| ClientError::Status {
                status,
                message: "catalog down".into(),
            })
        }

        async fn query(&self, filters: &SelectedFilters) -> Result<Vec<Record>, ClientError> {
            self.seen.lock().expect("seen").push(filters.clone());
            let key = filters.get(FilterField::Sector).unwrap_or("").to_string();
            let gate = self.gates.lock().expect("gates").remove(&key);
            match gate {
                Some(rx) => rx.await.unwrap_or_else(|_| {
                    Err(ClientError::Status {
                        status: 503,
                        message: "gate dropped".into(),
                    })
                }),
                None => Ok(Vec::new()),
            }
        }
    }

    fn energy(sector: &str) -> Vec<Record> {
        vec![Record::new().with("sector", sector).with("end_year", "2020").with("intensity", 4)]
    }

    fn top_sector(state: &ViewState) -> Option<String> {
        match state {
            ViewState::Ready(view) => view.sectors.points().first().map(|p| p.label.clone()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn stale_response_never_replaces_newer_one() {
        let (api, mut gates) = GatedApi::new(&["", "Old", "New"]);
        let controller = DashboardController::start(api, ControllerOptions::default()).await;

        let old = controller.set_filter(FilterField::Sector, Selection::value("Old"));
        let new = controller.set_filter(FilterField::Sector, Selection::value("New"));
        assert_eq!(controller.current(), ViewState::Loading);

        let _ = gates.remove("New").expect("gate").send(Ok(energy("New")));
        new.await.expect("new query task");
        assert_eq!(top_sector(&controller.current()).as_deref(), Some("New"));

        let _ = gates.remove("Old").expect("gate").send(Ok(energy("Old")));
        old.await.expect("old query task");
        assert_eq!(top_sector(&controller.current()).as_deref(), Some("New"));

        let _ = gates.remove("").expect("gate").send(Ok(energy("Initial")));
        tokio::task::yield_now().await;
        assert_eq!(top_sector(&controller.current()).as_deref(), Some("New"));
    }

    #[tokio::test]
    async fn each_mutation_issues_exactly_one_query() {
        let (api, _gates) = GatedApi::new(&[]);
        let controller = DashboardController::start(api, ControllerOptions::default()).await;
        controller
            .set_filter(FilterField::Region, Selection::value("World"))
            .await
            .expect("set");
        controller
            .set_filter(FilterField::Sector, Selection::value("Energy"))
            .await
            .expect("set");
        controller.clear_filter(FilterField::Region).await.expect("clear");
        controller.reset().await.expect("reset");

        let seen = controller.inner.api.seen.lock().expect("seen").clone();
        // initial query + four mutations
        assert_eq!(seen.len(), 5);
        assert_eq!(seen[2].len(), 2);
        assert_eq!(seen[3].get(FilterField::Sector), Some("Energy"));
        assert_eq!(seen[3].get(FilterField::Region), None);
        assert!(seen[4].is_empty());
        assert!(controller.filters().is_empty());
    }

    #[tokio::test]
    async fn empty_result_is_no_data_and_errors_are_unavailable() {
        let (api, mut gates) = GatedApi::new(&["Gone", "Down"]);
        let controller = DashboardController::start(api, ControllerOptions::default()).await;

        let empty = controller.set_filter(FilterField::Sector, Selection::value("Gone"));
        let _ = gates.remove("Gone").expect("gate").send(Ok(Vec::new()));
        empty.await.expect("task");
        assert_eq!(controller.current(), ViewState::NoData);

        let down = controller.set_filter(FilterField::Sector, Selection::value("Down"));
        let _ = gates.remove("Down").expect("gate").send(Err(ClientError::Status {
            status: 503,
            message: "the datastore is unavailable; try again later".into(),
        }));
        down.await.expect("task");
        assert_eq!(
            controller.current(),
            ViewState::Unavailable("the datastore is unavailable; try again later".into())
        );
    }

    #[tokio::test]
    async fn initial_filters_drive_the_first_query() {
        let (api, _gates) = GatedApi::new(&[]);
        let options = ControllerOptions {
            initial_filters: SelectedFilters::new().with(FilterField::Region, "World"),
            ..ControllerOptions::default()
        };
        let controller = DashboardController::start(api, options).await;
        controller.refresh().await.expect("refresh");
        let seen = controller.inner.api.seen.lock().expect("seen").clone();
        assert_eq!(seen[0].get(FilterField::Region), Some("World"));
        assert_eq!(controller.filters().get(FilterField::Region), Some("World"));
    }

    #[tokio::test]
    async fn catalog_failure_yields_empty_catalog() {
        let (mut api, _gates) = GatedApi::new(&[]);
        api.catalog = Err(503);
        let controller = DashboardController::start(api, ControllerOptions::default()).await;
        assert!(controller.catalog().is_empty());
        controller.refresh().await.expect("refresh");
        assert_eq!(controller.current(), ViewState::NoData);
    }

    #[tokio::test]
    async fn subscribers_observe_ready_views() {
        let (api, mut gates) = GatedApi::new(&["Energy"]);
        let controller = DashboardController::start(api, ControllerOptions::default()).await;
        assert_eq!(controller.catalog().values(FilterField::Sector), ["Energy"]);
        let mut rx = controller.subscribe();

        let task = controller.set_filter(FilterField::Sector, Selection::value("Energy"));
        let _ = gates.remove("Energy").expect("gate").send(Ok(energy("Energy")));
        task.await.expect("task");
        rx.changed().await.expect("view changed");
        assert_eq!(top_sector(&rx.borrow_and_update()).as_deref(), Some("Energy"));
    }
}
