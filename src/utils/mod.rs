/// Runs an expression and logs how long it took at debug level.
///
/// ```ignore
/// let ys = elapsed_module!("MEANDIFF", "infer", model.infer(&image)?);
/// ```
#[macro_export]
macro_rules! elapsed_module {
    ($module:expr, $stage:expr, $code:expr) => {{
        let t = std::time::Instant::now();
        let ret = $code;
        log::debug!("[{}] {:>18}: {:?}", $module, $stage, t.elapsed());
        ret
    }};
}
