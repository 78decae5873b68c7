use std::fmt;
use std::sync::{Arc, OnceLock};

/**
A stack of prefix segments.

The stack is persistent: pushing or popping returns a new stack that shares
its remaining segments with the original, and a segment is never changed once
it's been pushed. A segment only stores its own text. The concatenation of a
segment and its parents is built the first time it's read and cached on that
segment.
*/
#[derive(Clone, Default)]
pub(crate) struct Prefix {
    top: Option<Arc<Segment>>,
}

struct Segment {
    parent: Option<Arc<Segment>>,
    text: Box<str>,
    depth: usize,
    joined: OnceLock<Box<str>>,
}

impl Prefix {
    pub(crate) fn push(&self, segment: &str) -> Prefix {
        let parent = self.top.clone();
        let depth = parent.as_ref().map(|parent| parent.depth + 1).unwrap_or(1);

        Prefix {
            top: Some(Arc::new(Segment {
                parent,
                text: segment.into(),
                depth,
                joined: OnceLock::new(),
            })),
        }
    }

    /// The stack without its most recent segment. Popping an empty stack gives an empty stack.
    pub(crate) fn pop(&self) -> Prefix {
        Prefix {
            top: self.top.as_ref().and_then(|top| top.parent.clone()),
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        match self.top {
            Some(ref top) => &**top
                .joined
                .get_or_init(|| self.segments().concat().into_boxed_str()),
            None => "",
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.top.as_ref().map(|top| top.depth).unwrap_or(0)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.top.is_none()
    }

    /// The segments in the order they were pushed.
    pub(crate) fn segments(&self) -> Vec<&str> {
        let mut segments = Vec::with_capacity(self.len());

        let mut next = self.top.as_ref();
        while let Some(segment) = next {
            segments.push(&*segment.text);
            next = segment.parent.as_ref();
        }

        segments.reverse();
        segments
    }
}

impl Drop for Segment {
    // Unlink uniquely owned parents in a loop so dropping a deep stack doesn't recurse
    fn drop(&mut self) {
        let mut next = self.parent.take();

        while let Some(parent) = next {
            match Arc::try_unwrap(parent) {
                Ok(mut segment) => next = segment.parent.take(),
                Err(_) => break,
            }
        }
    }
}

impl fmt::Debug for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.segments()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_concatenate_in_push_order() {
        let prefix = Prefix::default().push("a").push("b").push("c");

        assert_eq!("abc", prefix.as_str());
        assert_eq!(vec!["a", "b", "c"], prefix.segments());
        assert_eq!(3, prefix.len());
    }

    #[test]
    fn pop_undoes_the_last_push() {
        let root = Prefix::default().push("req:").push("42");

        let popped = root.push("::").pop();

        assert_eq!(root.as_str(), popped.as_str());
        assert_eq!(root.segments(), popped.segments());
    }

    #[test]
    fn pop_removes_segments_not_characters() {
        // "ab" + "b" popped is "ab", not "a"
        let prefix = Prefix::default().push("ab").push("b").pop();

        assert_eq!("ab", prefix.as_str());
        assert_eq!(1, prefix.len());
    }

    #[test]
    fn pop_empty_is_empty() {
        let prefix = Prefix::default().pop().pop();

        assert!(prefix.is_empty());
        assert_eq!("", prefix.as_str());
        assert_eq!(0, prefix.len());
    }

    #[test]
    fn deep_stacks_drop_without_recursing() {
        let mut prefix = Prefix::default();
        for _ in 0..100_000 {
            prefix = prefix.push("");
        }

        let kept = prefix.pop();
        drop(prefix);

        assert_eq!(99_999, kept.len());
        drop(kept);
    }

    #[test]
    fn deep_stacks_store_each_segment_once() {
        let mut prefix = Prefix::default();
        for i in 0..10_000 {
            prefix = prefix.push(&format!("{:010}", i));
        }

        // Only the segments that are read cache a concatenation
        let mut cached = 0;
        let mut next = prefix.top.as_ref();
        while let Some(segment) = next {
            cached += segment.joined.get().map(|_| 1).unwrap_or(0);
            next = segment.parent.as_ref();
        }
        assert_eq!(0, cached);

        assert_eq!(100_000, prefix.as_str().len());
        assert!(prefix.as_str().starts_with("00000000000000000001"));
        assert!(prefix.pop().as_str().ends_with("0000009998"));
    }

    #[test]
    fn branches_share_without_interfering() {
        let root = Prefix::default().push("root/");

        let left = root.push("left");
        let right = root.push("right");

        assert_eq!("root/", root.as_str());
        assert_eq!("root/left", left.as_str());
        assert_eq!("root/right", right.as_str());
        assert!(Arc::ptr_eq(
            left.top.as_ref().and_then(|t| t.parent.as_ref()).unwrap(),
            right.top.as_ref().and_then(|t| t.parent.as_ref()).unwrap()
        ));
    }
}
