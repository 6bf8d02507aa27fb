pub mod dispatch_engine;
