use std::time::{Duration, Instant};

#[derive(Copy, Clone)]
pub struct Stopwatch {
    duration: Duration,
    last_instant: Option<Instant>,
    is_running: bool,
}

impl Stopwatch {
    pub fn new() -> Stopwatch {
        Stopwatch {
            duration: Duration::from_secs(0),
            last_instant: None,
            is_running: false,
        }
    }

    pub fn start_new() -> Stopwatch {
        let mut stopwatch = Stopwatch::new();
        stopwatch.start();
        stopwatch
    }

    pub fn start(&mut self) {
        self.update_time();
        self.is_running = true;
    }

    pub fn pause(&mut self) {
        self.update_time();
        self.is_running = false;
    }

    pub fn stop(mut self) -> Duration {
        self.update_time();
        self.duration
    }

    pub fn read(&mut self) -> Duration {
        self.update_time();
        self.duration
    }

    fn update_time(&mut self) {
        let now = Instant::now();

        if let (true, Some(last_instant)) = (self.is_running, self.last_instant) {
            self.duration += now - last_instant;
        }

        self.last_instant = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_start_pause_read() {
        let mut test_watch = Stopwatch::new();
        assert_eq!(test_watch.read(), Duration::from_secs(0));

        test_watch.start();
        thread::sleep(Duration::from_millis(20));
        let read_one = test_watch.read();

        test_watch.pause();
        thread::sleep(Duration::from_millis(40));
        let read_two = test_watch.read();

        test_watch.start();
        thread::sleep(Duration::from_millis(20));
        let read_three = test_watch.stop();

        assert!(read_one >= Duration::from_millis(20));
        // Paused time is not counted
        assert!(read_two - read_one < Duration::from_millis(40));
        assert!(read_three >= read_two + Duration::from_millis(20));
    }
}
