use hytra::TrAdder;
use indicatif::{ProgressBar, ProgressFinish, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const REFRESH: Duration = Duration::from_millis(50);

/// Run `f`, which counts the messages it passes (out of `n_messages`) on the adder it is given.
///
/// If `config.progress_min_time` is set and `f` runs for longer than that, a progress bar over
/// the message count is drawn until `f` returns.
pub(crate) fn with_progress<F, T>(
    f: F,
    n_messages: u64,
    pb_msg: &'static str,
    config: &crate::Config,
) -> T
where
    F: FnOnce(&TrAdder<u64>) -> T + Send,
    T: Send,
{
    let messages: TrAdder<u64> = TrAdder::new();
    let done = AtomicBool::new(false);
    thread::scope(|s| {
        let bar_thread = config.progress_min_time.map(|min_time| {
            let (messages, done) = (&messages, &done);
            s.spawn(move || draw_bar(messages, done, min_time, n_messages, pb_msg))
        });
        let res = f(&messages);
        done.store(true, Ordering::Release);
        // The bar thread may be parked (waiting for min_time, or between refreshes).
        if let Some(handle) = bar_thread {
            handle.thread().unpark();
        }
        res
    })
}

fn draw_bar(
    messages: &TrAdder<u64>,
    done: &AtomicBool,
    min_time: Duration,
    n_messages: u64,
    pb_msg: &'static str,
) {
    let start = Instant::now();
    while start.elapsed() < min_time {
        thread::park_timeout(min_time.saturating_sub(start.elapsed()));
        if done.load(Ordering::Acquire) {
            return;
        }
    }
    let style = ProgressStyle::default_bar()
        .template("{msg} [{elapsed_precise}] [{bar:40.green/white}] {pos}/{len} messages (ETA {eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    let pb = ProgressBar::new(n_messages)
        .with_style(style)
        .with_finish(ProgressFinish::AndClear)
        .with_message(pb_msg)
        .with_position(messages.get());
    while !done.load(Ordering::Acquire) {
        pb.set_position(messages.get());
        thread::park_timeout(REFRESH);
    }
    pb.finish_and_clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_to(n: u64, config: &crate::Config) -> u64 {
        with_progress(
            |cnt| {
                for _ in 0..n {
                    cnt.inc(1);
                }
                cnt.get()
            },
            n,
            "Test",
            config,
        )
    }

    #[test]
    fn counter_reaches_total() {
        assert_eq!(count_to(10, &crate::Config::with_default_timing()), 10);
        assert_eq!(count_to(10, &crate::Config::no_progress()), 10);
    }
}
