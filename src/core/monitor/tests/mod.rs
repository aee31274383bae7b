mod support;

mod scenario;
