#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, Response, StatusCode},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use catalogd::application::chairs::ChairService;
use catalogd::application::estates::EstateService;
use catalogd::application::maintenance::MaintenanceService;
use catalogd::application::repos::{
    CatalogRepo, ChairsRepo, EstatesRepo, MaintenanceRepo, RepoError, SqlScript,
};
use catalogd::cache::{CacheConfig, CatalogCaches};
use catalogd::domain::conditions::SearchConditions;
use catalogd::domain::entities::{CatalogEntity, Chair, DoorFit, Estate};
use catalogd::domain::geometry::BoundingBox;
use catalogd::domain::search::{PageWindow, Predicate, SearchFilter};
use catalogd::infra::http::{AppState, RouterOptions, build_router};

/// Columns the in-memory store can filter and order on.
pub trait Row: CatalogEntity {
    fn number(&self, column: &str) -> Option<i64>;
    fn text(&self, column: &str) -> Option<&str>;
    fn price(&self) -> i64;
    fn popularity(&self) -> i64;
    fn listed(&self) -> bool {
        true
    }
}

impl Row for Chair {
    fn number(&self, column: &str) -> Option<i64> {
        match column {
            "price" => Some(self.price),
            "height" => Some(self.height),
            "width" => Some(self.width),
            "depth" => Some(self.depth),
            _ => None,
        }
    }

    fn text(&self, column: &str) -> Option<&str> {
        match column {
            "kind" => Some(&self.kind),
            "color" => Some(&self.color),
            "features" => Some(&self.features),
            _ => None,
        }
    }

    fn price(&self) -> i64 {
        self.price
    }

    fn popularity(&self) -> i64 {
        self.popularity
    }

    fn listed(&self) -> bool {
        self.stock > 0
    }
}

impl Row for Estate {
    fn number(&self, column: &str) -> Option<i64> {
        match column {
            "rent" => Some(self.rent),
            "door_height" => Some(self.door_height),
            "door_width" => Some(self.door_width),
            _ => None,
        }
    }

    fn text(&self, column: &str) -> Option<&str> {
        match column {
            "features" => Some(&self.features),
            _ => None,
        }
    }

    fn price(&self) -> i64 {
        self.rent
    }

    fn popularity(&self) -> i64 {
        self.popularity
    }
}

fn matches<E: Row>(row: &E, filter: &SearchFilter) -> bool {
    filter.predicates().iter().all(|predicate| match predicate {
        Predicate::Range { column, range } => row.number(column).is_some_and(|value| {
            range.lower().is_none_or(|min| value >= min)
                && range.upper().is_none_or(|max| value < max)
        }),
        Predicate::Equals { column, value } => row.text(column) == Some(value.as_str()),
        Predicate::Contains { column, value } => {
            row.text(column).is_some_and(|text| text.contains(value.as_str()))
        }
    })
}

#[derive(Debug, Default)]
pub struct Calls {
    pub load_all: AtomicUsize,
    pub find_by_id: AtomicUsize,
    pub count_matching: AtomicUsize,
    pub matching_ids: AtomicUsize,
    pub lowest_priced_ids: AtomicUsize,
    pub insert_batch: AtomicUsize,
    pub recommended_ids: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// A table kept in memory, ordered by id.
pub struct MemoryRepo<E> {
    rows: Mutex<BTreeMap<i64, E>>,
    pub calls: Calls,
    delay: Duration,
    fail_inserts: AtomicBool,
}

impl<E: Row> MemoryRepo<E> {
    pub fn new(rows: Vec<E>) -> Self {
        Self::with_delay(rows, Duration::ZERO)
    }

    /// Every list query sleeps for `delay` first, widening the window in
    /// which concurrent callers overlap.
    pub fn with_delay(rows: Vec<E>, delay: Duration) -> Self {
        Self {
            rows: Mutex::new(rows.into_iter().map(|row| (row.id(), row)).collect()),
            calls: Calls::default(),
            delay,
            fail_inserts: AtomicBool::new(false),
        }
    }

    /// Make every later `insert_batch` abort like a rolled-back transaction.
    pub fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }

    pub fn row(&self, id: i64) -> Option<E> {
        self.rows.lock().expect("rows").get(&id).cloned()
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    fn by_popularity(&self, keep: impl Fn(&E) -> bool) -> Vec<i64> {
        let rows = self.rows.lock().expect("rows");
        let mut hits: Vec<&E> = rows.values().filter(|row| row.listed() && keep(row)).collect();
        hits.sort_by(|a, b| b.popularity().cmp(&a.popularity()).then(a.id().cmp(&b.id())));
        hits.into_iter().map(|row| row.id()).collect()
    }
}

#[async_trait]
impl<E: Row> CatalogRepo<E> for MemoryRepo<E> {
    async fn load_all(&self) -> Result<Vec<E>, RepoError> {
        self.calls.load_all.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.lock().expect("rows").values().cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<E>, RepoError> {
        self.calls.find_by_id.fetch_add(1, Ordering::SeqCst);
        Ok(self.row(id))
    }

    async fn count_matching(&self, filter: &SearchFilter) -> Result<i64, RepoError> {
        self.calls.count_matching.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        Ok(self.by_popularity(|row| matches(row, filter)).len() as i64)
    }

    async fn matching_ids(
        &self,
        filter: &SearchFilter,
        window: PageWindow,
    ) -> Result<Vec<i64>, RepoError> {
        self.calls.matching_ids.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        Ok(self
            .by_popularity(|row| matches(row, filter))
            .into_iter()
            .skip(window.offset() as usize)
            .take(window.limit() as usize)
            .collect())
    }

    async fn lowest_priced_ids(&self, limit: i64) -> Result<Vec<i64>, RepoError> {
        self.calls.lowest_priced_ids.fetch_add(1, Ordering::SeqCst);
        // Rows are read before the pause, like a query that started early.
        let ids: Vec<i64> = {
            let rows = self.rows.lock().expect("rows");
            let mut listed: Vec<&E> = rows.values().filter(|row| row.listed()).collect();
            listed.sort_by(|a, b| a.price().cmp(&b.price()).then(a.id().cmp(&b.id())));
            listed
                .into_iter()
                .take(limit as usize)
                .map(|row| row.id())
                .collect()
        };
        self.pause().await;
        Ok(ids)
    }

    async fn insert_batch(&self, records: Vec<E>) -> Result<Vec<E>, RepoError> {
        self.calls.insert_batch.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(RepoError::Persistence("transaction aborted".into()));
        }
        let mut rows = self.rows.lock().expect("rows");
        if records.iter().any(|record| rows.contains_key(&record.id())) {
            return Err(RepoError::Duplicate {
                constraint: "pkey".into(),
            });
        }
        for record in &records {
            rows.insert(record.id(), record.clone());
        }
        Ok(records)
    }
}

#[async_trait]
impl ChairsRepo for MemoryRepo<Chair> {
    async fn decrement_stock(&self, id: i64) -> Result<bool, RepoError> {
        let mut rows = self.rows.lock().expect("rows");
        match rows.get_mut(&id) {
            Some(chair) if chair.stock > 0 => {
                chair.stock -= 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl EstatesRepo for MemoryRepo<Estate> {
    async fn recommended_ids(&self, fit: DoorFit, limit: i64) -> Result<Vec<i64>, RepoError> {
        self.calls.recommended_ids.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        Ok(self
            .by_popularity(|estate| {
                (estate.door_width >= fit.shortest && estate.door_height >= fit.middle)
                    || (estate.door_width >= fit.middle && estate.door_height >= fit.shortest)
            })
            .into_iter()
            .take(limit as usize)
            .collect())
    }

    async fn ids_in_bounding_box(&self, bounds: BoundingBox) -> Result<Vec<i64>, RepoError> {
        Ok(self.by_popularity(|estate| {
            estate.latitude >= bounds.top_left.latitude
                && estate.latitude <= bounds.bottom_right.latitude
                && estate.longitude >= bounds.top_left.longitude
                && estate.longitude <= bounds.bottom_right.longitude
        }))
    }
}

/// Accepts every script without touching the tables.
#[derive(Default)]
pub struct NoopMaintenance {
    pub resets: AtomicUsize,
}

#[async_trait]
impl MaintenanceRepo for NoopMaintenance {
    async fn reset(&self, _scripts: &[SqlScript]) -> Result<(), RepoError> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub chairs: Arc<MemoryRepo<Chair>>,
    pub estates: Arc<MemoryRepo<Estate>>,
}

impl TestApp {
    pub async fn new(chairs: Vec<Chair>, estates: Vec<Estate>) -> Self {
        Self::from_repos(MemoryRepo::new(chairs), MemoryRepo::new(estates)).await
    }

    pub async fn from_repos(chairs: MemoryRepo<Chair>, estates: MemoryRepo<Estate>) -> Self {
        let chairs = Arc::new(chairs);
        let estates = Arc::new(estates);
        let conditions = Arc::new(SearchConditions::bundled().expect("bundled conditions"));
        let caches = CatalogCaches::new(&CacheConfig::default());

        let chair_service = ChairService::new(
            caches.chairs.clone(),
            chairs.clone(),
            Arc::new(conditions.chair.clone()),
        );
        let estate_service = EstateService::new(
            caches.estates.clone(),
            estates.clone(),
            caches.chairs.clone(),
            Arc::new(conditions.estate.clone()),
        );
        let maintenance = MaintenanceService::new(
            Arc::new(NoopMaintenance::default()),
            Vec::new(),
            chair_service.clone(),
            estate_service.clone(),
        );
        maintenance.preload().await.expect("preload");

        let state = AppState {
            chairs: Arc::new(chair_service),
            estates: Arc::new(estate_service),
            maintenance: Arc::new(maintenance),
            conditions,
        };
        let router = build_router(state.clone(), RouterOptions::default());

        Self {
            router,
            state,
            chairs,
            estates,
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, String) {
        self.send(Method::GET, uri, Body::empty()).await
    }

    pub async fn post_json(&self, uri: &str, json: &str) -> (StatusCode, String) {
        self.send(Method::POST, uri, Body::from(json.to_string()))
            .await
    }

    pub async fn send(&self, method: Method, uri: &str, body: Body) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body)
            .expect("request");
        let response = self.router.clone().oneshot(request).await.expect("response");
        read(response).await
    }

    /// Upload `csv` as the multipart file field `field`.
    pub async fn upload(&self, uri: &str, field: &str, csv: &str) -> (StatusCode, String) {
        const BOUNDARY: &str = "catalogd-test-boundary";
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; \
             filename=\"{field}.csv\"\r\nContent-Type: text/csv\r\n\r\n{csv}\r\n--{BOUNDARY}--\r\n"
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request");
        let response = self.router.clone().oneshot(request).await.expect("response");
        read(response).await
    }
}

pub async fn read(response: Response<Body>) -> (StatusCode, String) {
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    (status, String::from_utf8(bytes.to_vec()).expect("utf8 body"))
}

pub fn chair(id: i64, price: i64, popularity: i64, stock: i64) -> Chair {
    Chair {
        id,
        name: format!("chair {id}"),
        description: "sturdy".into(),
        thumbnail: format!("/images/chair/{id}.png"),
        price,
        height: 90,
        width: 50,
        depth: 50,
        color: "black".into(),
        features: "armrest".into(),
        kind: "office".into(),
        popularity,
        stock,
    }
}

pub fn estate(id: i64, rent: i64, popularity: i64) -> Estate {
    Estate {
        id,
        thumbnail: format!("/images/estate/{id}.png"),
        name: format!("estate {id}"),
        description: "bright".into(),
        latitude: 35.0 + id as f64 * 0.01,
        longitude: 139.0 + id as f64 * 0.01,
        address: format!("street {id}"),
        rent,
        door_height: 200,
        door_width: 100,
        features: "balcony".into(),
        popularity,
    }
}

pub fn json(body: &str) -> serde_json::Value {
    serde_json::from_str(body).expect("json body")
}
