//! Process-wide model handle, loaded once on first use.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::OnceCell;

use crate::error::Result;
use crate::model::SpeechModel;
use crate::remote::RemoteModel;

type LoadFn = Box<dyn Fn() -> BoxFuture<'static, Result<Arc<dyn SpeechModel>>> + Send + Sync>;

/// Lazily loads a [`SpeechModel`] and hands out the shared instance.
///
/// Concurrent callers of [`ModelLoader::get`] wait on one load. A failed load
/// is not cached; the next call tries again.
pub struct ModelLoader {
    cell: OnceCell<Arc<dyn SpeechModel>>,
    load: LoadFn,
}

impl ModelLoader {
    /// Creates a loader from an async constructor.
    pub fn new<F>(load: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<Arc<dyn SpeechModel>>> + Send + Sync + 'static,
    {
        Self {
            cell: OnceCell::new(),
            load: Box::new(load),
        }
    }

    /// Creates a loader for a model hosted on a model server.
    pub fn remote(base_url: impl Into<String>, model_id: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let model_id = model_id.into();
        Self::new(move || {
            let base_url = base_url.clone();
            let model_id = model_id.clone();
            Box::pin(async move {
                let model = RemoteModel::from_pretrained(&base_url, &model_id).await?;
                Ok(Arc::new(model) as Arc<dyn SpeechModel>)
            })
        })
    }

    /// Returns the model, loading it on the first call.
    pub async fn get(&self) -> Result<Arc<dyn SpeechModel>> {
        let model = self
            .cell
            .get_or_try_init(|| {
                tracing::info!("loading speech model");
                (self.load)()
            })
            .await?;
        Ok(Arc::clone(model))
    }

    /// Reports whether a load has completed.
    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }
}

impl std::fmt::Debug for ModelLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelLoader")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
