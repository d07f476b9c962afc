/// Every offset at which `needle` occurs in `haystack`, in ascending order.
///
/// Overlapping matches are reported. The iterator is `Clone`, so a scan can be
/// restarted or forked without rescanning from the top.
#[derive(Debug, Clone)]
pub struct Offsets<'a> {
    haystack: &'a [u8],
    needle: &'a [u8],
    pos: usize,
}

pub fn find_all<'a>(haystack: &'a [u8], needle: &'a [u8]) -> Offsets<'a> { Offsets { haystack, needle, pos: 0 } }

impl<'a> Iterator for Offsets<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.needle.is_empty() || self.pos >= self.haystack.len() {
            return None;
        }
        let found = self.haystack[self.pos..].windows(self.needle.len()).position(|w| w == self.needle);
        match found {
            Some(rel) => {
                let offset = self.pos + rel;
                self.pos = offset + 1;
                Some(offset)
            }
            None => {
                self.pos = self.haystack.len();
                None
            }
        }
    }
}

impl<'a> std::iter::FusedIterator for Offsets<'a> {}
