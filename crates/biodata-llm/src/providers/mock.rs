//! Scripted provider for tests. Never touches the network.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::provider::{CompletionError, CompletionFuture, CompletionProvider, CompletionRequest};

type Responder = Box<dyn Fn(&CompletionRequest) -> Result<String, CompletionError> + Send + Sync>;

enum Script {
    Fixed(String),
    /// Popped from the back; the last entry repeats once the rest are used.
    Sequence(Mutex<Vec<String>>),
    Responder(Responder),
    Failing(fn() -> CompletionError),
}

pub struct MockProvider {
    script: Script,
    delay: Option<Duration>,
    call_count: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockProvider {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            delay: None,
            call_count: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every request with the same text.
    pub fn always(response: impl Into<String>) -> Self {
        Self::with_script(Script::Fixed(response.into()))
    }

    /// Answer requests in order.
    pub fn with_sequence<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut queue: Vec<String> = responses.into_iter().map(Into::into).collect();
        queue.reverse();
        Self::with_script(Script::Sequence(Mutex::new(queue)))
    }

    /// Compute each answer from the request.
    pub fn responding<F>(f: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String, CompletionError> + Send + Sync + 'static,
    {
        Self::with_script(Script::Responder(Box::new(f)))
    }

    /// Fail every request with a network error.
    pub fn unreachable() -> Self {
        Self::with_script(Script::Failing(|| {
            CompletionError::Network("connection refused".into())
        }))
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn answer(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        match &self.script {
            Script::Fixed(text) => Ok(text.clone()),
            Script::Sequence(queue) => {
                let mut queue = queue
                    .lock()
                    .map_err(|_| CompletionError::Network("mock poisoned".into()))?;
                match queue.len() {
                    0 => Err(CompletionError::Parse("mock sequence is empty".into())),
                    1 => Ok(queue[0].clone()),
                    _ => Ok(queue.pop().unwrap_or_default()),
                }
            }
            Script::Responder(f) => f(request),
            Script::Failing(make) => Err(make()),
        }
    }
}

impl CompletionProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn complete<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a> {
        Box::pin(async move {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut seen) = self.requests.lock() {
                seen.push(request.clone());
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.answer(request)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "m".into(),
            system: "s".into(),
            prompt: "p".into(),
            temperature: 0.1,
            top_p: 0.9,
            max_tokens: 16,
        }
    }

    #[tokio::test]
    async fn sequence_repeats_last() {
        let mock = MockProvider::with_sequence(["a", "b"]);
        let req = request();
        assert_eq!(mock.complete(&req).await.unwrap(), "a");
        assert_eq!(mock.complete(&req).await.unwrap(), "b");
        assert_eq!(mock.complete(&req).await.unwrap(), "b");
        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.requests().len(), 3);
    }

    #[tokio::test]
    async fn unreachable_fails() {
        let mock = MockProvider::unreachable();
        assert!(matches!(
            mock.complete(&request()).await,
            Err(CompletionError::Network(_))
        ));
    }
}
