// src/crawl/frontier.rs
// =============================================================================
// The breadth-first work queue and its dedup set.
//
// How it works:
// 1. Seeds enter at depth 0
// 2. Workers pop tasks from the front (FIFO, so the crawl is breadth-first)
// 3. Links found on a page are offered back at depth + 1
// 4. When the queue is empty and nobody is still working on a page, the
//    crawl is over
//
// Every URL carries one of two marks:
// - Queued:  waiting in the queue, not fetched yet
// - Visited: popped at least once
// Both block re-enqueueing. "Queued" matters when two pages link to the same
// URL before it is first popped.
//
// Depth is checked twice: a link deeper than max_depth is never enqueued,
// and a task deeper than max_depth is never handed out. A task exactly at
// max_depth is handed out (so its status is recorded) but not expanded.
// =============================================================================

use std::collections::{HashMap, VecDeque};

use crate::urls::{LinkClassifier, NormalizedUrl, Verdict};

/// A URL waiting to be crawled, with its distance from the seeds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    pub url: NormalizedUrl,
    pub depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Queued,
    Visited,
}

/// Every URL this crawl has queued or visited. Only grows.
#[derive(Debug, Default)]
pub struct VisitedSet {
    marks: HashMap<NormalizedUrl, Mark>,
}

impl VisitedSet {
    /// Marks `url` queued. Returns false if it was already queued or visited.
    pub fn mark_queued(&mut self, url: &NormalizedUrl) -> bool {
        if self.marks.contains_key(url) {
            return false;
        }
        self.marks.insert(url.clone(), Mark::Queued);
        true
    }

    /// Marks `url` visited. Returns false if it had already been visited.
    pub fn mark_visited(&mut self, url: &NormalizedUrl) -> bool {
        match self.marks.insert(url.clone(), Mark::Visited) {
            Some(Mark::Visited) => false,
            _ => true,
        }
    }

    pub fn is_queued(&self, url: &NormalizedUrl) -> bool {
        self.marks.get(url) == Some(&Mark::Queued)
    }

    pub fn is_visited(&self, url: &NormalizedUrl) -> bool {
        self.marks.get(url) == Some(&Mark::Visited)
    }

    pub fn contains(&self, url: &NormalizedUrl) -> bool {
        self.marks.contains_key(url)
    }

    pub fn visited_count(&self) -> usize {
        self.marks.values().filter(|m| **m == Mark::Visited).count()
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }
}

/// What happened to a link offered to the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Enqueued,
    TooDeep,
    Rejected(Verdict),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontierState {
    /// Tasks are waiting in the queue
    HasWork,
    /// Queue is empty but pages are still being processed; more may arrive
    Draining,
    /// Nothing queued and nothing in flight: the crawl is finished
    Empty,
}

#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<CrawlTask>,
    seen: VisitedSet,
    classifier: LinkClassifier,
    max_depth: usize,
    in_flight: usize,
}

impl Frontier {
    pub fn new(classifier: LinkClassifier, max_depth: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            seen: VisitedSet::default(),
            classifier,
            max_depth,
            in_flight: 0,
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn classifier(&self) -> &LinkClassifier {
        &self.classifier
    }

    // Seeds skip the asset heuristics but still dedup against each other
    pub fn seed(&mut self, url: NormalizedUrl) -> bool {
        if !self.seen.mark_queued(&url) {
            return false;
        }
        self.queue.push_back(CrawlTask { url, depth: 0 });
        true
    }

    /// Offers a discovered link at `depth`
    pub fn offer(&mut self, url: NormalizedUrl, depth: usize) -> Offer {
        if depth > self.max_depth {
            return Offer::TooDeep;
        }
        match self.classifier.classify(&url, &mut self.seen) {
            Verdict::Crawlable => {
                self.queue.push_back(CrawlTask { url, depth });
                Offer::Enqueued
            }
            verdict => Offer::Rejected(verdict),
        }
    }

    /// Hands out the next task and counts it as in flight until `complete`
    pub fn pop(&mut self) -> Option<CrawlTask> {
        while let Some(task) = self.queue.pop_front() {
            if task.depth > self.max_depth {
                continue;
            }
            if !self.seen.mark_visited(&task.url) {
                continue;
            }
            self.in_flight += 1;
            return Some(task);
        }
        None
    }

    /// Called once per popped task, after its links have been offered
    pub fn complete(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    /// Whether links found on `task` should be offered at all
    pub fn should_expand(&self, task: &CrawlTask) -> bool {
        task.depth < self.max_depth
    }

    pub fn state(&self) -> FrontierState {
        if !self.queue.is_empty() {
            FrontierState::HasWork
        } else if self.in_flight > 0 {
            FrontierState::Draining
        } else {
            FrontierState::Empty
        }
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn seen(&self) -> &VisitedSet {
        &self.seen
    }
}
