//! Firmware heap
//!
//! linked_list_allocator over a static buffer in .bss. Registered as the
//! global allocator on bare-metal targets only; host builds keep the
//! system allocator.
//!
//! Call `init()` once before the first allocation.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr::{self, NonNull};
use core::sync::atomic::{AtomicBool, Ordering};
use linked_list_allocator::Heap;
use spin::Mutex;

/// Heap size: 2MB
pub const HEAP_SIZE: usize = 2 * 1024 * 1024;

/// Page-aligned heap buffer
#[repr(C, align(4096))]
struct AlignedHeapBuffer([u8; HEAP_SIZE]);

/// Static heap buffer - lives in .bss, zero-initialized
static mut HEAP_BUFFER: AlignedHeapBuffer = AlignedHeapBuffer([0u8; HEAP_SIZE]);

static HEAP: Mutex<Heap> = Mutex::new(Heap::empty());

static READY: AtomicBool = AtomicBool::new(false);

/// Hand the static buffer to the allocator. Later calls do nothing.
pub fn init() {
    if READY.swap(true, Ordering::SeqCst) {
        return;
    }
    // SAFETY: guarded by READY, the buffer is handed over exactly once and
    // never touched directly afterwards.
    unsafe {
        let heap_start = ptr::addr_of_mut!(HEAP_BUFFER) as *mut u8;
        HEAP.lock().init(heap_start, HEAP_SIZE);
    }
}

/// (used, free) bytes
pub fn usage() -> (usize, usize) {
    let heap = HEAP.lock();
    (heap.used(), heap.free())
}

pub struct FirmwareHeap;

unsafe impl GlobalAlloc for FirmwareHeap {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        HEAP.lock()
            .allocate_first_fit(layout)
            .map(|nn| nn.as_ptr())
            .unwrap_or(ptr::null_mut())
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if let Some(nn) = NonNull::new(ptr) {
            HEAP.lock().deallocate(nn, layout);
        }
    }
}

#[cfg(target_os = "none")]
#[global_allocator]
static ALLOCATOR: FirmwareHeap = FirmwareHeap;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_and_free() {
        init();
        init();
        let (used_before, _) = usage();
        let layout = Layout::from_size_align(0x40000, 64).unwrap();
        unsafe {
            let p = FirmwareHeap.alloc(layout);
            assert!(!p.is_null());
            assert_eq!(p as usize % 64, 0);
            assert!(usage().0 >= used_before + 0x40000);
            FirmwareHeap.dealloc(p, layout);
        }
        assert_eq!(usage().0, used_before);
    }

    #[test]
    fn test_oversized_request_fails() {
        init();
        let layout = Layout::from_size_align(HEAP_SIZE * 2, 8).unwrap();
        let p = unsafe { FirmwareHeap.alloc(layout) };
        assert!(p.is_null());
    }
}
