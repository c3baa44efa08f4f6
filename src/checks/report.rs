use colored::Colorize;

/// Sink for the human-readable progress report.
pub trait Reporter {
    /// Plain result line.
    fn line(&mut self, text: &str);

    /// Progress header printed before a check starts.
    fn header(&mut self, text: &str) {
        self.line(text);
    }

    /// Final banner of a passing run.
    fn success(&mut self, text: &str) {
        self.line(text);
    }

    fn blank(&mut self) {
        self.line("");
    }
}

/// Prints to stdout.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn line(&mut self, text: &str) {
        println!("{text}");
    }

    fn header(&mut self, text: &str) {
        println!("{}", text.bold());
    }

    fn success(&mut self, text: &str) {
        println!("{}", text.green().bold());
    }
}

/// Collects lines in memory.
impl Reporter for Vec<String> {
    fn line(&mut self, text: &str) {
        self.push(text.to_string());
    }
}

impl<T: Reporter + ?Sized> Reporter for &mut T {
    fn line(&mut self, text: &str) {
        (**self).line(text);
    }

    fn header(&mut self, text: &str) {
        (**self).header(text);
    }

    fn success(&mut self, text: &str) {
        (**self).success(text);
    }

    fn blank(&mut self) {
        (**self).blank();
    }
}
