//! Page-granular processing strategies.
//!
//! Pages are independent, so every strategy hands whole pages to a walker and
//! only differs in how the work is spread over threads:
//! - Sequential (baseline)
//! - Batch-parallel (std::thread on batches of pages)
//! - Channel-pipeline (reader → workers → ordered writer over mpsc channels)
//!
//! All of them write entries in dump order.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::dump::{read_page, scan_pages, RawPage, ScannedPage};
use crate::error::{Error, Result};
use crate::model::Entry;
use crate::Extractor;

/// Configuration for parallel processing
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Number of threads for batch-parallel processing
    pub num_threads: usize,
    /// Pages per batch for batch-parallel processing
    pub batch_size: usize,
    /// Channel buffer size for pipeline processing
    pub channel_buffer: usize,
    /// Number of worker threads for pipeline processing
    pub num_workers: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        let cpus = thread::available_parallelism().map(|p| p.get()).unwrap_or(4);
        Self {
            num_threads: cpus,
            batch_size: 1000,
            channel_buffer: 10000,
            num_workers: cpus.saturating_sub(1).max(1),
        }
    }
}

/// Stop conditions, mostly for trying things out on a full dump.
#[derive(Debug, Clone, Copy, Default)]
pub struct Limits {
    /// Stop after writing this many entries.
    pub entries: Option<usize>,
    /// Stop after reading this many `<page>` elements.
    pub pages: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    Walked,
    Redirect,
    NonArticle,
    /// No title or no text.
    Skipped,
}

/// Result of page processing. Every scanned page produces exactly one, so
/// the ordered writer never waits on a page that will not come.
#[derive(Debug)]
pub struct ProcessedPage {
    pub page_id: usize,
    pub title: String,
    pub outcome: PageOutcome,
    pub entries: Vec<Entry>,
    pub diagnostics: usize,
}

impl ProcessedPage {
    fn without_entries(page_id: usize, title: String, outcome: PageOutcome) -> Self {
        ProcessedPage {
            page_id,
            title,
            outcome,
            entries: Vec::new(),
            diagnostics: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub pages_processed: usize,
    pub pages_with_entries: usize,
    pub entries_written: usize,
    pub redirects: usize,
    pub non_article: usize,
    pub skipped: usize,
    pub diagnostics: usize,
    pub elapsed: Duration,
}

impl Stats {
    /// Pages per second.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.pages_processed as f64 / secs
        } else {
            0.0
        }
    }

    fn record(&mut self, page: &ProcessedPage) {
        self.pages_processed += 1;
        self.diagnostics += page.diagnostics;
        match page.outcome {
            PageOutcome::Redirect => self.redirects += 1,
            PageOutcome::NonArticle => self.non_article += 1,
            PageOutcome::Skipped => self.skipped += 1,
            PageOutcome::Walked if page.entries.is_empty() => self.skipped += 1,
            PageOutcome::Walked => self.pages_with_entries += 1,
        }
    }
}

/// Scan one `<page>` element and walk it if it is an article.
pub fn process_page_xml(extractor: &Extractor, page_xml: &str, page_id: usize) -> ProcessedPage {
    match read_page(page_xml, page_id) {
        ScannedPage::Article(raw) => process_raw_page(extractor, raw),
        ScannedPage::Redirect { title } => ProcessedPage::without_entries(page_id, title, PageOutcome::Redirect),
        ScannedPage::NonArticle { title, .. } => {
            ProcessedPage::without_entries(page_id, title, PageOutcome::NonArticle)
        }
        ScannedPage::Malformed => ProcessedPage::without_entries(page_id, String::new(), PageOutcome::Skipped),
    }
}

pub fn process_raw_page(extractor: &Extractor, raw: RawPage) -> ProcessedPage {
    let result = extractor.parse_page(&raw.title, &raw.text);
    ProcessedPage {
        page_id: raw.page_id,
        title: raw.title,
        outcome: PageOutcome::Walked,
        entries: result.entries,
        diagnostics: result.diagnostics.len(),
    }
}

fn entry_limit_reached(stats: &Stats, limit: Option<usize>) -> bool {
    limit.is_some_and(|l| stats.entries_written >= l)
}

/// Write one page's entries as JSON lines. Returns true once the entry limit
/// is reached.
fn write_page<W: Write>(page: ProcessedPage, stats: &mut Stats, writer: &mut W, limit: Option<usize>) -> Result<bool> {
    stats.record(&page);
    for entry in page.entries {
        if entry_limit_reached(stats, limit) {
            return Ok(true);
        }
        serde_json::to_writer(&mut *writer, &entry)?;
        writer.write_all(b"\n")?;
        stats.entries_written += 1;
    }
    Ok(entry_limit_reached(stats, limit))
}

/// Baseline: scan and walk pages one after another on the calling thread.
/// `on_page` sees the running statistics after every page.
pub fn process_sequential<W: Write>(
    extractor: &Extractor,
    reader: impl BufRead,
    writer: &mut W,
    limits: Limits,
    mut on_page: impl FnMut(&Stats),
) -> Result<Stats> {
    let start_time = Instant::now();
    let mut stats = Stats::default();
    let mut page_id: usize = 0;
    let mut failure: Option<Error> = None;

    scan_pages(reader, |page_xml| {
        if limits.pages.is_some_and(|l| page_id >= l) {
            return false;
        }
        let page = process_page_xml(extractor, &page_xml, page_id);
        page_id += 1;
        match write_page(page, &mut stats, writer, limits.entries) {
            Ok(limit_reached) => {
                on_page(&stats);
                !limit_reached
            }
            Err(err) => {
                failure = Some(err);
                false
            }
        }
    })?;

    if let Some(err) = failure {
        return Err(err);
    }
    writer.flush()?;
    stats.elapsed = start_time.elapsed();
    Ok(stats)
}

/// Strategy 1: Batch-Parallel Processing using std::thread
/// Collects pages into batches, then splits each batch over scoped threads
pub fn process_batch_parallel<W: Write>(
    extractor: &Extractor,
    reader: impl BufRead,
    writer: &mut W,
    config: &ParallelConfig,
    limits: Limits,
) -> Result<Stats> {
    let start_time = Instant::now();
    let mut stats = Stats::default();
    let batch_size = config.batch_size.max(1);
    let mut batch: Vec<String> = Vec::with_capacity(batch_size);
    let mut page_id: usize = 0;
    let mut limit_reached = false;
    let mut failure: Option<Error> = None;

    tracing::debug!(threads = config.num_threads, batch_size, "batch-parallel processing");

    scan_pages(reader, |page_xml| {
        if limits.pages.is_some_and(|l| page_id >= l) {
            return false;
        }
        batch.push(page_xml);
        page_id += 1;
        if batch.len() < batch_size {
            return true;
        }
        let base_id = page_id - batch.len();
        match flush_batch(extractor, &mut batch, base_id, config.num_threads, &mut stats, writer, limits.entries) {
            Ok(reached) => {
                limit_reached = reached;
                !reached
            }
            Err(err) => {
                failure = Some(err);
                false
            }
        }
    })?;

    if let Some(err) = failure {
        return Err(err);
    }
    if !limit_reached && !batch.is_empty() {
        let base_id = page_id - batch.len();
        flush_batch(extractor, &mut batch, base_id, config.num_threads, &mut stats, writer, limits.entries)?;
    }

    writer.flush()?;
    stats.elapsed = start_time.elapsed();
    Ok(stats)
}

fn flush_batch<W: Write>(
    extractor: &Extractor,
    batch: &mut Vec<String>,
    base_id: usize,
    num_threads: usize,
    stats: &mut Stats,
    writer: &mut W,
    limit: Option<usize>,
) -> Result<bool> {
    let results = process_batch_threaded(extractor, batch, base_id, num_threads);
    batch.clear();
    for page in results {
        if write_page(page, stats, writer, limit)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Process a batch of pages using multiple threads; results keep batch order.
fn process_batch_threaded(
    extractor: &Extractor,
    batch: &[String],
    base_id: usize,
    num_threads: usize,
) -> Vec<ProcessedPage> {
    if batch.is_empty() {
        return Vec::new();
    }

    let num_threads = num_threads.min(batch.len()).max(1);
    let chunk_size = batch.len().div_ceil(num_threads);

    thread::scope(|scope| {
        let handles: Vec<_> = batch
            .chunks(chunk_size)
            .enumerate()
            .map(|(i, chunk)| {
                let first_id = base_id + i * chunk_size;
                scope.spawn(move || {
                    chunk
                        .iter()
                        .enumerate()
                        .map(|(j, xml)| process_page_xml(extractor, xml, first_id + j))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut results = Vec::with_capacity(batch.len());
        for handle in handles {
            match handle.join() {
                Ok(chunk_results) => results.extend(chunk_results),
                Err(_) => tracing::error!("batch worker panicked; its pages are lost"),
            }
        }
        results
    })
}

/// Strategy 2: Channel-Pipeline Processing using std::sync::mpsc
/// A reader thread scans pages, worker threads walk them, and the calling
/// thread writes results back in page order
pub fn process_channel_pipeline<W: Write>(
    extractor: Arc<Extractor>,
    reader: impl BufRead + Send + 'static,
    writer: &mut W,
    config: &ParallelConfig,
    limits: Limits,
) -> Result<Stats> {
    let (page_tx, page_rx): (SyncSender<(usize, String)>, Receiver<(usize, String)>) =
        sync_channel(config.channel_buffer);
    let (result_tx, result_rx): (SyncSender<ProcessedPage>, Receiver<ProcessedPage>) =
        sync_channel(config.channel_buffer);

    let stop = Arc::new(AtomicBool::new(false));
    let start_time = Instant::now();

    tracing::debug!(workers = config.num_workers, buffer = config.channel_buffer, "channel pipeline");

    let reader_stop = Arc::clone(&stop);
    let reader_handle = thread::spawn(move || read_pages_to_channel(reader, page_tx, &reader_stop, limits.pages));

    let page_rx = Arc::new(Mutex::new(page_rx));
    let worker_handles: Vec<JoinHandle<()>> = (0..config.num_workers.max(1))
        .map(|_| {
            let extractor = Arc::clone(&extractor);
            let rx = Arc::clone(&page_rx);
            let tx = result_tx.clone();
            let stop = Arc::clone(&stop);
            thread::spawn(move || process_pages_worker(&extractor, rx, tx, &stop))
        })
        .collect();

    // The receiver and the result sender now live only in the workers, so
    // the reader notices when they are gone and the result channel closes
    // when they finish.
    drop(page_rx);
    drop(result_tx);

    let mut stats = write_results_sorted(result_rx, writer, limits.entries, &stop)?;

    for handle in worker_handles {
        if handle.join().is_err() {
            tracing::error!("pipeline worker panicked");
        }
    }
    match reader_handle.join() {
        Ok(read) => {
            read?;
        }
        Err(_) => tracing::error!("pipeline reader panicked"),
    }

    stats.elapsed = start_time.elapsed();
    Ok(stats)
}

fn read_pages_to_channel(
    reader: impl BufRead,
    tx: SyncSender<(usize, String)>,
    stop: &AtomicBool,
    page_limit: Option<usize>,
) -> Result<usize> {
    let mut page_id: usize = 0;
    scan_pages(reader, |page_xml| {
        if stop.load(Ordering::Relaxed) || page_limit.is_some_and(|l| page_id >= l) {
            return false;
        }
        if tx.send((page_id, page_xml)).is_err() {
            return false;
        }
        page_id += 1;
        true
    })?;
    Ok(page_id)
}

fn process_pages_worker(
    extractor: &Extractor,
    rx: Arc<Mutex<Receiver<(usize, String)>>>,
    tx: SyncSender<ProcessedPage>,
    stop: &AtomicBool,
) {
    loop {
        if stop.load(Ordering::Relaxed) {
            break;
        }

        let item = {
            let lock = rx.lock().ok();
            lock.and_then(|guard| guard.recv().ok())
        };

        match item {
            Some((page_id, xml)) => {
                let page = process_page_xml(extractor, &xml, page_id);
                if tx.send(page).is_err() {
                    break;
                }
            }
            None => break,
        }
    }
}

/// Write results in page order using a streaming reorder buffer.
///
/// Results that arrive before their predecessors wait in a BTreeMap; the rest
/// are written immediately.
fn write_results_sorted<W: Write>(
    rx: Receiver<ProcessedPage>,
    writer: &mut W,
    limit: Option<usize>,
    stop: &AtomicBool,
) -> Result<Stats> {
    let mut stats = Stats::default();
    let mut pending: BTreeMap<usize, ProcessedPage> = BTreeMap::new();
    let mut next_expected: usize = 0;

    for page in rx {
        if page.page_id != next_expected {
            pending.insert(page.page_id, page);
            continue;
        }
        if write_page(page, &mut stats, writer, limit)? {
            stop.store(true, Ordering::SeqCst);
            writer.flush()?;
            return Ok(stats);
        }
        next_expected += 1;

        while let Some(buffered) = pending.remove(&next_expected) {
            if write_page(buffered, &mut stats, writer, limit)? {
                stop.store(true, Ordering::SeqCst);
                writer.flush()?;
                return Ok(stats);
            }
            next_expected += 1;
        }
    }

    // Only left over when a worker died mid-page.
    if !pending.is_empty() {
        tracing::warn!(pages = pending.len(), "writing pages after a gap in the page order");
    }
    while let Some((_, page)) = pending.pop_first() {
        if write_page(page, &mut stats, writer, limit)? {
            break;
        }
    }

    writer.flush()?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Edition, TemplateStore};
    use std::io::Cursor;

    fn extractor() -> Extractor {
        Extractor::new(Edition::builtin("ms").unwrap(), TemplateStore::new())
    }

    fn page(title: &str, ns: i64, text: &str) -> String {
        format!(
            "<page>\n<title>{}</title>\n<ns>{}</ns>\n<revision>\n<text xml:space=\"preserve\">{}</text>\n</revision>\n</page>\n",
            title, ns, text
        )
    }

    fn dump(words: usize) -> String {
        let mut xml = String::from("<mediawiki>\n");
        for i in 0..words {
            xml.push_str(&page(
                &format!("kata{}", i),
                0,
                &format!("==Bahasa Melayu==\n===Kata nama===\n# makna {}", i),
            ));
        }
        xml.push_str(&page("Templat:lb", 10, "{{{1}}}"));
        xml.push_str(&page("Kata0", 0, "#REDIRECT [[kata0]]").replace("<ns>0</ns>", "<ns>0</ns>\n<redirect title=\"kata0\" />"));
        xml.push_str("</mediawiki>\n");
        xml
    }

    fn words(output: &[u8]) -> Vec<String> {
        String::from_utf8_lossy(output)
            .lines()
            .map(|line| {
                let entry: Entry = serde_json::from_str(line).unwrap();
                entry.word
            })
            .collect()
    }

    fn config(threads: usize) -> ParallelConfig {
        ParallelConfig {
            num_threads: threads,
            batch_size: 7,
            channel_buffer: 4,
            num_workers: threads,
        }
    }

    // ─── single pages ───

    #[test]
    fn page_outcomes() {
        let extractor = extractor();
        let walked = process_page_xml(&extractor, &page("kucing", 0, "==Bahasa Melayu==\n===Kata nama===\n# haiwan"), 3);
        assert_eq!(walked.outcome, PageOutcome::Walked);
        assert_eq!(walked.page_id, 3);
        assert_eq!(walked.entries.len(), 1);

        let template = process_page_xml(&extractor, &page("Templat:x", 10, "x"), 4);
        assert_eq!(template.outcome, PageOutcome::NonArticle);
        assert!(template.entries.is_empty());

        let broken = process_page_xml(&extractor, "<page><ns>0</ns></page>", 5);
        assert_eq!(broken.outcome, PageOutcome::Skipped);
        assert_eq!(broken.page_id, 5);
    }

    // ─── strategies ───

    #[test]
    fn sequential_writes_every_article() {
        let extractor = extractor();
        let mut out = Vec::new();
        let mut calls = 0;
        let stats = process_sequential(&extractor, dump(5).as_bytes(), &mut out, Limits::default(), |_| calls += 1).unwrap();
        assert_eq!(words(&out), vec!["kata0", "kata1", "kata2", "kata3", "kata4"]);
        assert_eq!(calls, 7);
        assert_eq!(stats.pages_processed, 7);
        assert_eq!(stats.pages_with_entries, 5);
        assert_eq!(stats.entries_written, 5);
        assert_eq!(stats.non_article, 1);
        assert_eq!(stats.redirects, 1);
    }

    #[test]
    fn strategies_agree_on_order() {
        let extractor = extractor();
        let xml = dump(40);

        let mut sequential = Vec::new();
        process_sequential(&extractor, xml.as_bytes(), &mut sequential, Limits::default(), |_| {}).unwrap();

        let mut batched = Vec::new();
        let stats = process_batch_parallel(&extractor, xml.as_bytes(), &mut batched, &config(3), Limits::default()).unwrap();
        assert_eq!(stats.entries_written, 40);

        let mut piped = Vec::new();
        let stats = process_channel_pipeline(
            Arc::new(extractor.clone()),
            Cursor::new(xml.into_bytes()),
            &mut piped,
            &config(3),
            Limits::default(),
        )
        .unwrap();
        assert_eq!(stats.pages_processed, 42);

        assert_eq!(words(&sequential).len(), 40);
        assert_eq!(sequential, batched);
        assert_eq!(sequential, piped);
    }

    #[test]
    fn entry_limit_stops_every_strategy() {
        let extractor = extractor();
        let xml = dump(30);
        let limits = Limits {
            entries: Some(4),
            pages: None,
        };

        let mut out = Vec::new();
        let stats = process_sequential(&extractor, xml.as_bytes(), &mut out, limits, |_| {}).unwrap();
        assert_eq!(stats.entries_written, 4);
        assert_eq!(words(&out), vec!["kata0", "kata1", "kata2", "kata3"]);

        let mut out = Vec::new();
        process_batch_parallel(&extractor, xml.as_bytes(), &mut out, &config(2), limits).unwrap();
        assert_eq!(words(&out), vec!["kata0", "kata1", "kata2", "kata3"]);

        let mut out = Vec::new();
        process_channel_pipeline(Arc::new(extractor), Cursor::new(xml.into_bytes()), &mut out, &config(2), limits)
            .unwrap();
        assert_eq!(words(&out), vec!["kata0", "kata1", "kata2", "kata3"]);
    }

    #[test]
    fn page_limit_counts_scanned_pages() {
        let extractor = extractor();
        let xml = dump(10);
        let limits = Limits {
            entries: None,
            pages: Some(3),
        };

        let mut out = Vec::new();
        let stats = process_batch_parallel(&extractor, xml.as_bytes(), &mut out, &config(2), limits).unwrap();
        assert_eq!(stats.pages_processed, 3);

        let mut out = Vec::new();
        let stats =
            process_channel_pipeline(Arc::new(extractor), Cursor::new(xml.into_bytes()), &mut out, &config(2), limits)
                .unwrap();
        assert_eq!(stats.pages_processed, 3);
        assert_eq!(words(&out), vec!["kata0", "kata1", "kata2"]);
    }
}
