use crate::{ApiError, RemoteApi};
use caldera_schema::Args;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// A recorded control-plane invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub service: String,
    pub operation: String,
    pub args: Args,
}

#[derive(Debug, Clone)]
enum Scripted {
    Ok(Value),
    NotFound,
    Api { code: String, message: String },
}

/// Scripted in-memory control plane for engine and adapter tests.
///
/// Responses are queued per `service.operation`. Each invocation records its
/// arguments and pops the front of the queue; the final entry is replayed
/// once the queue would otherwise run dry, so a single scripted response
/// serves any number of calls. Invoking an operation with no script at all
/// is an error, which keeps tests honest about the calls they expect.
pub struct MockApi {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    invocations: Mutex<Vec<Invocation>>,
}

impl Default for MockApi {
    fn default() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            invocations: Mutex::new(Vec::new()),
        }
    }
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, service: &str, operation: &str, scripted: Scripted) {
        self.scripts
            .lock()
            .expect("script lock poisoned")
            .entry(key(service, operation))
            .or_default()
            .push_back(scripted);
    }

    /// Queue a successful response for `service.operation`.
    #[must_use]
    pub fn with_response(self, service: &str, operation: &str, response: Value) -> Self {
        self.push(service, operation, Scripted::Ok(response));
        self
    }

    /// Queue a transport-level not-found failure.
    #[must_use]
    pub fn with_not_found(self, service: &str, operation: &str) -> Self {
        self.push(service, operation, Scripted::NotFound);
        self
    }

    /// Queue a structured remote failure.
    #[must_use]
    pub fn with_error(self, service: &str, operation: &str, code: &str, message: &str) -> Self {
        self.push(
            service,
            operation,
            Scripted::Api {
                code: code.to_owned(),
                message: message.to_owned(),
            },
        );
        self
    }

    /// All invocations recorded so far, in call order.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations
            .lock()
            .expect("invocation lock poisoned")
            .clone()
    }

    /// Number of calls made to `service.operation`.
    pub fn invocation_count(&self, service: &str, operation: &str) -> usize {
        self.invocations()
            .iter()
            .filter(|i| i.service == service && i.operation == operation)
            .count()
    }
}

impl RemoteApi for MockApi {
    fn invoke(&self, service: &str, operation: &str, args: &Args) -> Result<Value, ApiError> {
        self.invocations
            .lock()
            .expect("invocation lock poisoned")
            .push(Invocation {
                service: service.to_owned(),
                operation: operation.to_owned(),
                args: args.clone(),
            });

        let mut scripts = self.scripts.lock().expect("script lock poisoned");
        let Some(queue) = scripts.get_mut(&key(service, operation)) else {
            return Err(ApiError::Http(format!(
                "no scripted response for {service}.{operation}"
            )));
        };
        let scripted = if queue.len() > 1 {
            queue.pop_front().expect("non-empty queue")
        } else {
            queue.front().cloned().expect("non-empty queue")
        };
        match scripted {
            Scripted::Ok(value) => Ok(value),
            Scripted::NotFound => Err(ApiError::NotFound(key(service, operation))),
            Scripted::Api { code, message } => Err(ApiError::Api { code, message }),
        }
    }
}

fn key(service: &str, operation: &str) -> String {
    format!("{service}.{operation}")
}
