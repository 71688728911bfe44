mod helpers;
mod presence;
