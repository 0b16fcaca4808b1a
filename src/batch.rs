//! Many independent charts at once, spread over a rayon pool.

use rayon::prelude::*;
use tracing::debug;

use crate::chart::{ChartComposer, ChartRequest, Figure, TradeAnnotation};
use crate::market::Series;
use crate::source::DataSource;

/// One chart to compose.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub series: Series,
    pub request: ChartRequest,
    pub trades: Vec<TradeAnnotation>,
}

impl RenderJob {
    pub fn new(series: Series, request: ChartRequest) -> Self {
        Self {
            series,
            request,
            trades: Vec::new(),
        }
    }

    pub fn trades(mut self, trades: Vec<TradeAnnotation>) -> Self {
        self.trades = trades;
        self
    }
}

fn chunk_size(jobs: usize) -> usize {
    jobs.div_ceil(num_cpus::get()).max(1)
}

/// Composes every job. Figures come back in job order.
pub fn render_batch(composer: &ChartComposer, jobs: &[RenderJob]) -> Vec<Figure> {
    let chunk_size = chunk_size(jobs.len());
    debug!(jobs = jobs.len(), chunk_size, "rendering batch");
    jobs.par_chunks(chunk_size)
        .flat_map_iter(|chunk| {
            chunk
                .iter()
                .map(|job| composer.compose(&job.series, &job.request, &job.trades))
        })
        .collect()
}

/// Loads and composes every request. A failed load becomes a fault figure.
pub fn load_and_render(composer: &ChartComposer, requests: &[ChartRequest], source: DataSource<'_>) -> Vec<Figure> {
    let chunk_size = chunk_size(requests.len());
    requests
        .par_chunks(chunk_size)
        .flat_map_iter(|chunk| {
            chunk
                .iter()
                .map(|request| composer.compose_outcome(request.load(source), request, &[]))
        })
        .collect()
}
