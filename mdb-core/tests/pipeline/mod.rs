mod copy;
mod export;
mod preview;
