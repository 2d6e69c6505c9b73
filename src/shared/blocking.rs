//! Usage: Named wrapper to run blocking filesystem work off the async runtime.

pub(crate) async fn run<T, F>(name: &'static str, task: F) -> Result<T, String>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, String> + Send + 'static,
{
    match tauri::async_runtime::spawn_blocking(task).await {
        Ok(result) => result,
        Err(err) => Err(format!("BLOCKING_TASK: {name} join failed: {err}")),
    }
}
