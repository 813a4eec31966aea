//! Replay statistics collection and reporting.
//!
//! Tracks what a trace replay pushed through the controller and how long
//! reads took to come back.

use std::time::Instant;

/// Summary of one trace replay.
pub struct ReplayStats {
    start_time: Instant,
    pub cycles: u64,
    pub memory_cycles: i64,

    pub reads: u64,
    pub writes: u64,
    pub responses: u64,
    pub rejected_submissions: u64,

    pub total_latency: u64,
    pub max_latency: u64,
}

impl Default for ReplayStats {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            cycles: 0,
            memory_cycles: 0,
            reads: 0,
            writes: 0,
            responses: 0,
            rejected_submissions: 0,
            total_latency: 0,
            max_latency: 0,
        }
    }
}

impl ReplayStats {
    /// Accounts for one read response that took `latency` host cycles.
    pub fn record_response(&mut self, latency: u64) {
        self.responses += 1;
        self.total_latency += latency;
        self.max_latency = self.max_latency.max(latency);
    }

    /// Mean read latency in host cycles.
    pub fn average_latency(&self) -> f64 {
        if self.responses == 0 {
            0.0
        } else {
            self.total_latency as f64 / self.responses as f64
        }
    }

    /// Prints a formatted summary.
    pub fn print(&self) {
        let seconds = self.start_time.elapsed().as_secs_f64();
        let khz = if seconds > 0.0 {
            (self.cycles as f64 / seconds) / 1000.0
        } else {
            0.0
        };

        println!("\n==========================================================");
        println!("DRAM CONTROLLER REPLAY STATISTICS");
        println!("==========================================================");
        println!("host_seconds             {:.4} s", seconds);
        println!("sim_cycles               {}", self.cycles);
        println!("sim_freq                 {:.2} kHz", khz);
        println!("mem_cycles               {}", self.memory_cycles);
        println!("----------------------------------------------------------");
        println!("REQUESTS");
        println!("  req.read               {}", self.reads);
        println!("  req.write              {}", self.writes);
        println!("  req.completed          {}", self.responses);
        println!("  req.rejected           {}", self.rejected_submissions);
        println!("----------------------------------------------------------");
        println!("READ LATENCY (host cycles)");
        println!("  lat.avg                {:.2}", self.average_latency());
        println!("  lat.max                {}", self.max_latency);
        println!("==========================================================");
    }
}
