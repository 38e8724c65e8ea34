use std::time::Instant;
use storydesk::contexts::{Generation, PublishOutcome};

/// Console progress for one run, in the order the steps happen.
pub struct RunProgress {
    failed_calls: usize,
    start_time: Instant,
}

impl RunProgress {
    pub fn new() -> Self {
        Self {
            failed_calls: 0,
            start_time: Instant::now(),
        }
    }

    pub fn start_step(&self, name: &str) {
        println!("{}...", name);
    }

    pub fn generation(&mut self, label: &str, generation: &Generation) {
        if generation.is_failure() {
            self.failed_calls += 1;
            eprintln!("✗ {}: {}", label, generation.text);
        } else {
            println!(
                "✓ {} received ({} chars, {} tokens)",
                label,
                generation.text.chars().count(),
                generation.tokens
            );
        }
    }

    pub fn finish(&self, outcome: &PublishOutcome) {
        let elapsed = self.start_time.elapsed();
        println!("\n{}", "=".repeat(60));
        println!("Summary:");
        match outcome {
            PublishOutcome::Published(report) => {
                println!("  Headline:  {}", report.record.headline);
                println!("  Idea:      {}", report.record.idea_number);
                println!("  Story:     {}", report.story_path.display());
                println!("  Index:     {}", report.index_path.display());
                println!("  Tokens:    {}", report.tokens);
                println!("  Cost:      ${:.4}", report.estimated_cost);
            }
            PublishOutcome::AlreadyPublished { filename } => {
                println!("  Skipped:   already published as {}", filename);
            }
        }
        if self.failed_calls > 0 {
            println!("  Failed generation calls: {}", self.failed_calls);
        }
        println!("  Duration:  {:.2}s", elapsed.as_secs_f64());
        println!("{}", "=".repeat(60));
    }
}
