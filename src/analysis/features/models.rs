//! Process-wide model cache
//!
//! Heavyweight model state (label vocabularies, threshold tables) is built
//! at most once per process, on first use, and kept for the life of the
//! worker. The cache is an owned struct held by the pipeline, not a
//! module global.

use crate::analysis::features::genre::GenreModel;
use crate::analysis::features::instruments::InstrumentModel;
use once_cell::sync::OnceCell;
use tracing::info;

#[derive(Debug, Default)]
pub struct ModelCache {
    instrument: OnceCell<InstrumentModel>,
    genre: OnceCell<GenreModel>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instrument predictor, loaded on first use
    pub fn instrument(&self) -> &InstrumentModel {
        self.instrument.get_or_init(|| {
            let model = InstrumentModel::load();
            info!("Loaded instrument model ({} labels)", model.labels().len());
            model
        })
    }

    /// Genre/mood scorer, loaded on first use
    pub fn genre(&self) -> &GenreModel {
        self.genre.get_or_init(|| {
            let model = GenreModel::load();
            info!("Loaded genre model ({} labels)", model.labels().len());
            model
        })
    }
}
